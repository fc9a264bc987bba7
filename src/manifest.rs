use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::errors::{Result, SegError};

/// Column naming the image file relative to the configured image directory.
pub const FNAME_COLUMN: &str = "fname";

/// Terminal processing status of one manifest row.
///
/// Rows start pending and are assigned exactly once by the batch runner;
/// the numeric codes land in the `processed_status` output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Pending,
    Success,
    Failure,
}

impl RowStatus {
    pub const fn code(self) -> i8 {
        match self {
            Self::Pending => 0,
            Self::Success => 1,
            Self::Failure => -1,
        }
    }
}

/// Outcome of one manifest row: a status and, on success, the per-class
/// fraction vector.
#[derive(Debug, Clone)]
pub struct RowResult {
    pub status: RowStatus,
    pub fractions: Option<Vec<f32>>,
}

impl RowResult {
    pub const fn success(fractions: Vec<f32>) -> Self {
        Self {
            status: RowStatus::Success,
            fractions: Some(fractions),
        }
    }

    pub const fn failure() -> Self {
        Self {
            status: RowStatus::Failure,
            fractions: None,
        }
    }
}

/// The input manifest table, loaded fully up front.
///
/// Columns other than `fname` are carried through untouched to the output
/// table, so the manifest can hold arbitrary downstream metadata.
#[derive(Debug)]
pub struct Manifest {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    fname_index: usize,
}

impl Manifest {
    /// Loads the manifest CSV. A missing file is fatal to the whole batch;
    /// a missing `fname` column is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SegError::ManifestNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut reader = csv::Reader::from_reader(file);
        let headers = reader.headers()?.clone();
        let fname_index = headers
            .iter()
            .position(|h| h == FNAME_COLUMN)
            .ok_or_else(|| SegError::Configuration {
                message: format!("manifest is missing the required '{}' column", FNAME_COLUMN),
            })?;

        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            headers,
            rows,
            fname_index,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fname(&self, index: usize) -> &str {
        self.rows[index].get(self.fname_index).unwrap_or("")
    }

    /// Writes the result table once, as a unit: original columns plus
    /// `feature_0..feature_{C-1}` and `processed_status`. Failed rows leave
    /// their feature cells empty.
    pub fn write_results(
        &self,
        path: &Path,
        results: &[RowResult],
        classes: usize,
    ) -> Result<()> {
        debug_assert_eq!(results.len(), self.rows.len());

        let mut writer = csv::Writer::from_path(path).map_err(|e| SegError::FileSystem {
            path: path.to_path_buf(),
            operation: "output table creation".to_string(),
            source: std::io::Error::other(e),
        })?;

        let mut header = self.headers.clone();
        for c in 0..classes {
            header.push_field(&format!("feature_{}", c));
        }
        header.push_field("processed_status");
        writer.write_record(&header)?;

        for (row, result) in self.rows.iter().zip(results) {
            let mut record = row.clone();
            match &result.fractions {
                Some(fractions) => {
                    for value in fractions {
                        record.push_field(&value.to_string());
                    }
                }
                None => {
                    for _ in 0..classes {
                        record.push_field("");
                    }
                }
            }
            record.push_field(&result.status.code().to_string());
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| SegError::FileSystem {
            path: path.to_path_buf(),
            operation: "output table flush".to_string(),
            source: e,
        })?;
        Ok(())
    }
}
