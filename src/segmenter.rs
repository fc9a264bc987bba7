use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::prelude::*;

use crate::errors::{Result, SegError};
use crate::features;
use crate::grid::WindowSpec;
use crate::normalize::Normalizer;
use crate::ops;
use crate::scale::ScaleProcessor;
use crate::traits::SegmentationModel;

/// Immutable configuration-plus-service context for multi-scale inference:
/// the model handle, normalization constants, window spec, and scale set.
///
/// For each configured scale the source image is resized so its longer edge
/// equals `round(scale * base_size)`, run through the sliding-window scale
/// processor, and the resulting probability maps are summed. Summation rather
/// than averaging is deliberate: every scale's softmax output is already a
/// per-pixel distribution, so sum-then-argmax is an unweighted ensemble vote.
#[derive(Debug)]
pub struct Segmenter<M: SegmentationModel> {
    model: M,
    normalizer: Normalizer,
    spec: WindowSpec,
    scales: Vec<f32>,
    base_size: u32,
    flip: bool,
}

impl<M: SegmentationModel> Segmenter<M> {
    pub fn new(
        model: M,
        normalizer: Normalizer,
        spec: WindowSpec,
        scales: Vec<f32>,
        base_size: u32,
        flip: bool,
    ) -> Result<Self> {
        if model.num_classes() == 0 {
            return Err(SegError::Configuration {
                message: "model must report a positive class count".to_string(),
            });
        }
        if spec.crop_h == 0 || spec.crop_w == 0 {
            return Err(SegError::Configuration {
                message: "crop window must be positive on both axes".to_string(),
            });
        }
        if !(spec.stride_rate > 0.0 && spec.stride_rate <= 1.0) {
            return Err(SegError::Configuration {
                message: format!("stride rate must be in (0, 1], got {}", spec.stride_rate),
            });
        }
        if base_size == 0 {
            return Err(SegError::Configuration {
                message: "base size must be positive".to_string(),
            });
        }
        if scales.is_empty() || scales.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(SegError::Configuration {
                message: format!("scales must be non-empty and positive, got {:?}", scales),
            });
        }

        Ok(Self {
            model,
            normalizer,
            spec,
            scales,
            base_size,
            flip,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// Sums per-scale probability maps into one `(h, w, C)` map at the
    /// source resolution.
    pub fn predict_probabilities(&self, image: &RgbImage) -> Result<Array3<f32>> {
        let (width, height) = image.dimensions();
        let (height, width) = (height as usize, width as usize);
        if height == 0 || width == 0 {
            return Err(SegError::InvalidInput {
                reason: "image has zero area".to_string(),
            });
        }

        let processor = ScaleProcessor::new(&self.model, &self.normalizer, self.spec, self.flip);
        let mut total = Array3::<f32>::zeros((height, width, self.num_classes()));
        for &scale in &self.scales {
            let long_size = ((scale * self.base_size as f32).round() as u32).max(1);
            let (new_w, new_h) = scaled_dimensions(width as u32, height as u32, long_size);
            let scaled = imageops::resize(image, new_w, new_h, FilterType::Triangle);
            total += &processor.process(&scaled, height, width)?;
        }
        Ok(total)
    }

    /// Per-pixel argmax of the summed multi-scale map.
    pub fn label_map(&self, image: &RgbImage) -> Result<Array2<usize>> {
        let probs = self.predict_probabilities(image)?;
        Ok(ops::argmax_classes(probs.view()))
    }

    /// Per-class pixel-fraction feature vector for one image.
    pub fn class_fractions(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let labels = self.label_map(image)?;
        Ok(features::class_fractions(labels.view(), self.num_classes()))
    }
}

/// Aspect-preserving target dimensions whose longer edge equals `long_size`.
fn scaled_dimensions(width: u32, height: u32, long_size: u32) -> (u32, u32) {
    if height > width {
        let new_w = ((long_size as f32 / height as f32) * width as f32).round() as u32;
        (new_w.max(1), long_size)
    } else {
        let new_h = ((long_size as f32 / width as f32) * height as f32).round() as u32;
        (long_size, new_h.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSegmentationModel;

    fn spec() -> WindowSpec {
        WindowSpec::new(16, 16, WindowSpec::DEFAULT_STRIDE_RATE)
    }

    #[test]
    fn test_scaled_dimensions_preserve_aspect() {
        assert_eq!(scaled_dimensions(100, 50, 200), (200, 100));
        assert_eq!(scaled_dimensions(50, 100, 200), (100, 200));
        assert_eq!(scaled_dimensions(64, 64, 32), (32, 32));
    }

    #[test]
    fn test_rejects_empty_scales() {
        let err = Segmenter::new(
            MockSegmentationModel::new(3),
            Normalizer::imagenet(),
            spec(),
            vec![],
            64,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, SegError::Configuration { .. }));
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        let err = Segmenter::new(
            MockSegmentationModel::new(3),
            Normalizer::imagenet(),
            spec(),
            vec![0.5, -1.0],
            64,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, SegError::Configuration { .. }));
    }

    #[test]
    fn test_rejects_bad_stride_rate() {
        let err = Segmenter::new(
            MockSegmentationModel::new(3),
            Normalizer::imagenet(),
            WindowSpec::new(16, 16, 0.0),
            vec![1.0],
            64,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, SegError::Configuration { .. }));
    }
}
