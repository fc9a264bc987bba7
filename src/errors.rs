use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the segmentation pipeline.
///
/// # Why structured errors
///
/// Each variant captures context specific to its error domain (configuration,
/// manifest handling, per-image processing, model operations), providing
/// diagnostic information without requiring callers to parse error strings.
/// The thiserror crate generates Display implementations automatically from
/// format strings, reducing boilerplate while maintaining type safety.
///
/// Variants split into two severities: batch-fatal errors (`Configuration`,
/// `ManifestNotFound`, `FileSystem` on the output table) abort the run, while
/// row-recoverable errors (`UnreadableImage`, `InvalidInput`, `Model`) are
/// absorbed by the batch runner as a per-row failure status.
#[derive(Error, Debug)]
pub enum SegError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Manifest not found: {path:?}")]
    ManifestNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unreadable image: {path}")]
    UnreadableImage {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl SegError {
    /// Whether the batch runner may record this error as a per-row failure
    /// and continue with the next manifest row.
    pub const fn is_row_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnreadableImage { .. } | Self::InvalidInput { .. } | Self::Model { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SegError>;

/// Convert ONNX Runtime errors to model errors.
impl From<ort::Error> for SegError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert ndarray shape errors to model errors.
///
/// Shape errors occur during tensor operations which are part of model
/// inference, so they're categorized as model errors rather than a separate
/// tensor error type. This keeps the error hierarchy flat and focused on
/// user-facing error domains.
impl From<ndarray::ShapeError> for SegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert image crate errors to per-image errors.
impl From<image::ImageError> for SegError {
    fn from(err: image::ImageError) -> Self {
        Self::UnreadableImage {
            path: "unknown".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert CSV errors to filesystem errors.
///
/// CSV errors surface while reading the manifest or writing the result table,
/// both of which are filesystem concerns from the caller's point of view.
/// Code that has path context should construct the variant directly.
impl From<csv::Error> for SegError {
    fn from(err: csv::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "csv processing".to_string(),
            source: std::io::Error::other(err),
        }
    }
}

impl From<std::io::Error> for SegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}
