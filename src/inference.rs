use image::RgbImage;
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::errors::{Result, SegError};
use crate::normalize::Normalizer;
use crate::ops;
use crate::traits::SegmentationModel;

/// Runs the model on one fixed-size window and returns a per-pixel class
/// probability map aligned to that window.
///
/// With flip augmentation enabled (the default) the window and its horizontal
/// mirror go through the model as one two-element batch; the mirrored result
/// is flipped back and averaged with the direct result. This doubles compute
/// per window but reduces orientation bias.
pub struct WindowInferencer<'a, M: SegmentationModel + ?Sized> {
    model: &'a M,
    normalizer: &'a Normalizer,
    flip: bool,
}

impl<'a, M: SegmentationModel + ?Sized> WindowInferencer<'a, M> {
    pub const fn new(model: &'a M, normalizer: &'a Normalizer, flip: bool) -> Self {
        Self {
            model,
            normalizer,
            flip,
        }
    }

    /// Infers one window, returning an `(H, W, C)` probability map whose
    /// per-pixel class scores sum to ~1.
    pub fn infer(&self, crop: &RgbImage) -> Result<Array3<f32>> {
        let (crop_w, crop_h) = crop.dimensions();
        let (crop_h, crop_w) = (crop_h as usize, crop_w as usize);

        let tensor = self.normalizer.normalize(crop.as_ndarray3())?;

        let batch_len = if self.flip { 2 } else { 1 };
        let mut batch = Array4::<f32>::zeros((batch_len, 3, crop_h, crop_w));
        batch.index_axis_mut(Axis(0), 0).assign(&tensor);
        if self.flip {
            batch
                .index_axis_mut(Axis(0), 1)
                .assign(&ops::hflip_chw(tensor.view()));
        }

        let scores = self.model.predict(batch.view())?;
        let (n, classes, out_h, out_w) = scores.dim();
        if n != batch_len || classes != self.model.num_classes() {
            return Err(SegError::Model {
                operation: "output shape validation".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "expected ({}, {}, _, _) scores, got ({}, {}, {}, {})",
                        batch_len,
                        self.model.num_classes(),
                        n,
                        classes,
                        out_h,
                        out_w
                    ),
                )),
            });
        }

        // The model may emit a spatially coarser map than its input (internal
        // downsampling); correct it back to the window size before softmax.
        let mut scores = if (out_h, out_w) == (crop_h, crop_w) {
            scores
        } else {
            let mut corrected = Array4::<f32>::zeros((n, classes, crop_h, crop_w));
            for i in 0..n {
                corrected.index_axis_mut(Axis(0), i).assign(
                    &ops::resize_chw_align_corners(scores.index_axis(Axis(0), i), crop_h, crop_w),
                );
            }
            corrected
        };

        ops::softmax_classes(&mut scores);

        let mut probs = scores.index_axis(Axis(0), 0).to_owned();
        if self.flip {
            probs += &ops::hflip_chw(scores.index_axis(Axis(0), 1));
            probs /= 2.0;
        }

        Ok(probs
            .permuted_axes([1, 2, 0])
            .as_standard_layout()
            .to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSegmentationModel;
    use image::Rgb;

    fn red_crop(size: u32) -> RgbImage {
        RgbImage::from_pixel(size, size, Rgb([255, 0, 0]))
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = MockSegmentationModel::new(3);
        let norm = Normalizer::imagenet();
        let inferencer = WindowInferencer::new(&model, &norm, true);

        let probs = inferencer.infer(&red_crop(8)).unwrap();
        assert_eq!(probs.dim(), (8, 8, 3));
        for y in 0..8 {
            for x in 0..8 {
                let sum: f32 = (0..3).map(|c| probs[[y, x, c]]).sum();
                assert!((sum - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_uniform_red_prefers_first_class() {
        let model = MockSegmentationModel::new(3);
        let norm = Normalizer::imagenet();
        let inferencer = WindowInferencer::new(&model, &norm, true);

        let probs = inferencer.infer(&red_crop(4)).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert!(probs[[y, x, 0]] > probs[[y, x, 1]]);
                assert!(probs[[y, x, 0]] > probs[[y, x, 2]]);
            }
        }
    }

    #[test]
    fn test_coarse_output_is_upsampled_to_window_size() {
        let model = MockSegmentationModel::new(3).with_output_downscale(2);
        let norm = Normalizer::imagenet();
        let inferencer = WindowInferencer::new(&model, &norm, false);

        let probs = inferencer.infer(&red_crop(8)).unwrap();
        assert_eq!(probs.dim(), (8, 8, 3));
    }

    #[test]
    fn test_flip_matches_direct_on_symmetric_input() {
        let model = MockSegmentationModel::new(3);
        let norm = Normalizer::imagenet();
        let with_flip = WindowInferencer::new(&model, &norm, true);
        let without = WindowInferencer::new(&model, &norm, false);

        let crop = red_crop(6);
        let a = with_flip.infer(&crop).unwrap();
        let b = without.infer(&crop).unwrap();
        for (lhs, rhs) in a.iter().zip(b.iter()) {
            assert!((lhs - rhs).abs() < 1e-6);
        }
    }
}
