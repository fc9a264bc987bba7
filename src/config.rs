use std::path::PathBuf;
use std::thread;

use clap::Parser;

use crate::errors::{Result, SegError};
use crate::grid::WindowSpec;

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory containing the input images
    #[arg(long)]
    pub image_dir: PathBuf,

    /// Input manifest CSV with an `fname` column
    #[arg(long)]
    pub manifest_file: PathBuf,

    /// Where to write the result table
    #[arg(long)]
    pub output_file: PathBuf,

    #[arg(short, long)]
    pub model_path: PathBuf,

    /// Model architecture registered in the model registry
    #[arg(short, long, default_value = "onnx")]
    pub arch: String,

    /// Number of segmentation classes C
    #[arg(short, long, default_value_t = 150)]
    pub classes: usize,

    /// Long-edge size at scale 1.0
    #[arg(long, default_value_t = 512)]
    pub base_size: u32,

    #[arg(long, default_value_t = 473)]
    pub crop_h: usize,

    #[arg(long, default_value_t = 473)]
    pub crop_w: usize,

    /// Fraction of the crop size between consecutive window starts
    #[arg(long, default_value_t = WindowSpec::DEFAULT_STRIDE_RATE)]
    pub stride_rate: f32,

    /// Resize scale factors, applied independently and summed
    #[arg(long, value_delimiter = ',', default_value = "1.0")]
    pub scales: Vec<f32>,

    /// Disable horizontal-flip augmentation
    #[arg(long)]
    pub no_flip: bool,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(
        short, long, default_value_t = thread::available_parallelism().unwrap().get()
    )]
    pub num_threads: usize,
}

impl Config {
    pub const fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(self.crop_h, self.crop_w, self.stride_rate)
    }

    pub const fn flip(&self) -> bool {
        !self.no_flip
    }

    /// Rejects unusable parameter combinations before any model or image is
    /// loaded, so configuration mistakes fail the run up front.
    pub fn validate(&self) -> Result<()> {
        if self.classes == 0 {
            return Err(SegError::Configuration {
                message: "classes must be positive".to_string(),
            });
        }
        if self.base_size == 0 {
            return Err(SegError::Configuration {
                message: "base size must be positive".to_string(),
            });
        }
        if self.crop_h == 0 || self.crop_w == 0 {
            return Err(SegError::Configuration {
                message: "crop window must be positive on both axes".to_string(),
            });
        }
        if !(self.stride_rate > 0.0 && self.stride_rate <= 1.0) {
            return Err(SegError::Configuration {
                message: format!("stride rate must be in (0, 1], got {}", self.stride_rate),
            });
        }
        if self.scales.is_empty() || self.scales.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(SegError::Configuration {
                message: format!(
                    "scales must be non-empty and positive, got {:?}",
                    self.scales
                ),
            });
        }
        if self.num_threads == 0 {
            return Err(SegError::Configuration {
                message: "num threads must be positive".to_string(),
            });
        }
        Ok(())
    }
}
