use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::errors::{Result, SegError};
use crate::manifest::{Manifest, RowResult};
use crate::segmenter::Segmenter;
use crate::traits::SegmentationModel;

/// Final accounting for one batch run.
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Drives the per-image pipeline over a manifest of images.
///
/// Each row moves from pending to exactly one terminal status: success with a
/// fraction vector, or failure with the cause logged. A failing row never
/// aborts the batch; only manifest and output-table errors are fatal. The
/// result table is written once, after every row has been visited.
pub struct BatchRunner<M: SegmentationModel> {
    segmenter: Segmenter<M>,
    image_dir: PathBuf,
}

impl<M: SegmentationModel> BatchRunner<M> {
    pub const fn new(segmenter: Segmenter<M>, image_dir: PathBuf) -> Self {
        Self {
            segmenter,
            image_dir,
        }
    }

    pub fn run(&self, manifest_path: &Path, output_path: &Path) -> Result<BatchSummary> {
        info!("starting batch processing for manifest {:?}", manifest_path);
        let started = Instant::now();

        let manifest = Manifest::load(manifest_path)?;
        let total = manifest.len();
        if manifest.is_empty() {
            warn!("manifest contains no rows");
        }

        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map_err(|e| SegError::Configuration {
                message: format!("invalid progress template: {}", e),
            })?
            .progress_chars("#>-"),
        );

        // Rows are independent; rayon distributes them across the pool and
        // the order-preserving collect keeps each result in its row's slot.
        let results: Vec<RowResult> = (0..total)
            .into_par_iter()
            .progress_with(progress.clone())
            .map(|index| self.process_row(index, total, &manifest))
            .collect();
        progress.finish();

        manifest.write_results(output_path, &results, self.segmenter.num_classes())?;

        let succeeded = results
            .iter()
            .filter(|r| r.fractions.is_some())
            .count();
        let summary = BatchSummary {
            total,
            succeeded,
            failed: total - succeeded,
            elapsed: started.elapsed(),
        };
        info!(
            "batch processing complete: {}/{} succeeded, {} failed in {:.2?}",
            summary.succeeded, summary.total, summary.failed, summary.elapsed
        );
        info!("results saved to {:?}", output_path);
        Ok(summary)
    }

    fn process_row(&self, index: usize, total: usize, manifest: &Manifest) -> RowResult {
        let fname = manifest.fname(index);
        let path = self.image_dir.join(fname);

        match self.process_image(&path) {
            Ok(fractions) => {
                info!("processed image {}/{}: {:?}", index + 1, total, path);
                RowResult::success(fractions)
            }
            Err(e) => {
                if e.is_row_recoverable() {
                    warn!("failed to process {:?}: {}", path, e);
                } else {
                    error!("unexpected error processing {:?}: {}", path, e);
                }
                RowResult::failure()
            }
        }
    }

    fn process_image(&self, path: &Path) -> Result<Vec<f32>> {
        let image = image::open(path)
            .map_err(|e| SegError::UnreadableImage {
                path: path.display().to_string(),
                source: Box::new(e),
            })?
            .to_rgb8();
        self.segmenter.class_fractions(&image)
    }
}
