//! Batch semantic segmentation with per-class area-fraction feature
//! extraction.
//!
//! The core is a multi-scale overlapping sliding-window inference engine:
//! each image is resized to a set of scales; each scale is padded to the
//! model's crop size if needed, covered by a deterministic grid of
//! overlapping windows, inferred window by window (optionally with
//! horizontal-flip augmentation), and the overlapping probability maps are
//! averaged. Per-scale maps are summed, argmaxed into a label map, and
//! reduced to a per-class pixel-fraction vector per manifest row.

pub mod batch;
pub mod config;
pub mod errors;
pub mod features;
pub mod grid;
pub mod inference;
pub mod manifest;
pub mod model;
pub mod normalize;
pub mod ops;
pub mod registry;
pub mod scale;
pub mod segmenter;
pub mod traits;

pub mod mocks;

pub use batch::{BatchRunner, BatchSummary};
pub use config::Config;
pub use errors::{Result, SegError};
pub use grid::{CropWindow, WindowSpec};
pub use manifest::{Manifest, RowResult, RowStatus};
pub use model::Model;
pub use normalize::Normalizer;
pub use registry::ModelRegistry;
pub use segmenter::Segmenter;
pub use traits::SegmentationModel;

#[cfg(test)]
pub use mocks::*;
