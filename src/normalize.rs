use image::Rgb;
use ndarray::prelude::*;

use crate::errors::{Result, SegError};

/// Value range the normalization statistics are scaled to.
const VALUE_SCALE: f32 = 255.0;

/// Converts raw 8-bit pixel data into the model's expected representation:
/// channel-first f32 with per-channel mean/std normalization.
///
/// The mean also doubles as the padding fill value in the scale processor, so
/// padded margins normalize to zero and contribute no signal.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    mean: [f32; 3],
    std: [f32; 3],
}

impl Normalizer {
    /// ImageNet statistics scaled to the [0, 255] sample range.
    pub fn imagenet() -> Self {
        Self::new([0.485, 0.456, 0.406], [0.229, 0.224, 0.225])
    }

    /// Statistics given in the [0, 1] range, scaled internally.
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            mean: mean.map(|m| m * VALUE_SCALE),
            std: std.map(|s| s * VALUE_SCALE),
        }
    }

    /// Normalizes a `(3, H, W)` u8 view into a `(3, H, W)` f32 tensor.
    pub fn normalize(&self, pixels: ArrayView3<u8>) -> Result<Array3<f32>> {
        let (channels, height, width) = pixels.dim();
        if channels != 3 {
            return Err(SegError::InvalidInput {
                reason: format!("expected 3 channels, got {}", channels),
            });
        }

        let mut tensor = Array3::<f32>::zeros((3, height, width));
        for c in 0..3 {
            let mean = self.mean[c];
            let std = self.std[c];
            let mut channel = tensor.index_axis_mut(Axis(0), c);
            channel.assign(&pixels.index_axis(Axis(0), c).mapv(|v| (v as f32 - mean) / std));
        }
        Ok(tensor)
    }

    /// Channel means rounded to u8, used as the padding fill color.
    pub fn mean_pixel(&self) -> Rgb<u8> {
        Rgb(self.mean.map(|m| m.round().clamp(0.0, 255.0) as u8))
    }
}
