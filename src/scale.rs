use image::{imageops, RgbImage};
use ndarray::prelude::*;

use crate::errors::Result;
use crate::grid::{plan_windows, CropWindow, WindowSpec};
use crate::inference::WindowInferencer;
use crate::normalize::Normalizer;
use crate::ops;
use crate::traits::SegmentationModel;

/// Merges per-window probability maps into one full-image map by averaging
/// over the number of windows that covered each pixel.
///
/// Averaging rather than summing is what makes overlap handling independent
/// of window evaluation order: a pixel covered by k windows receives the mean
/// of k estimates, never a k-times inflated score.
pub struct OverlapAccumulator {
    prediction: Array3<f32>,
    count: Array2<f32>,
}

impl OverlapAccumulator {
    pub fn new(height: usize, width: usize, classes: usize) -> Self {
        Self {
            prediction: Array3::zeros((height, width, classes)),
            count: Array2::zeros((height, width)),
        }
    }

    /// Adds one window's `(h, w, C)` probabilities into its sub-region.
    pub fn add(&mut self, window: &CropWindow, probs: ArrayView3<f32>) {
        let mut region = self.prediction.slice_mut(s![
            window.top..window.bottom(),
            window.left..window.right(),
            ..
        ]);
        region += &probs;

        let mut counts = self.count.slice_mut(s![
            window.top..window.bottom(),
            window.left..window.right()
        ]);
        counts += 1.0;
    }

    /// Finalizes into the per-pixel mean over contributing windows.
    ///
    /// A correctly planned grid covers every pixel at least once, so the
    /// count is >= 1 everywhere.
    pub fn into_mean(self) -> Array3<f32> {
        let mut prediction = self.prediction;
        let count = self.count.insert_axis(Axis(2));
        prediction /= &count;
        prediction
    }
}

/// Runs the full windowed pipeline for one resize scale of an image: pad,
/// plan the crop grid, infer each window, average overlaps, crop the padding
/// back off, and resize to the original resolution.
pub struct ScaleProcessor<'a, M: SegmentationModel + ?Sized> {
    inferencer: WindowInferencer<'a, M>,
    normalizer: &'a Normalizer,
    spec: WindowSpec,
    classes: usize,
}

impl<'a, M: SegmentationModel + ?Sized> ScaleProcessor<'a, M> {
    pub fn new(model: &'a M, normalizer: &'a Normalizer, spec: WindowSpec, flip: bool) -> Self {
        Self {
            inferencer: WindowInferencer::new(model, normalizer, flip),
            normalizer,
            spec,
            classes: model.num_classes(),
        }
    }

    /// Processes one scaled image, returning an `(out_h, out_w, C)`
    /// probability map at the original (pre-scale) resolution.
    pub fn process(&self, scaled: &RgbImage, out_h: usize, out_w: usize) -> Result<Array3<f32>> {
        let (scaled_w, scaled_h) = scaled.dimensions();
        let (scaled_h, scaled_w) = (scaled_h as usize, scaled_w as usize);

        // Images smaller than the crop window are padded with the channel
        // mean, which normalizes to zero. Odd padding puts the extra
        // row/column on the bottom/right.
        let pad_h = self.spec.crop_h.saturating_sub(scaled_h);
        let pad_w = self.spec.crop_w.saturating_sub(scaled_w);
        let pad_top = pad_h / 2;
        let pad_left = pad_w / 2;

        let padded;
        let image = if pad_h > 0 || pad_w > 0 {
            let mut canvas = RgbImage::from_pixel(
                (scaled_w + pad_w) as u32,
                (scaled_h + pad_h) as u32,
                self.normalizer.mean_pixel(),
            );
            imageops::replace(&mut canvas, scaled, pad_left as i64, pad_top as i64);
            padded = canvas;
            &padded
        } else {
            scaled
        };

        let height = scaled_h + pad_h;
        let width = scaled_w + pad_w;
        let mut accumulator = OverlapAccumulator::new(height, width, self.classes);
        for window in plan_windows(height, width, &self.spec) {
            let crop = imageops::crop_imm(
                image,
                window.left as u32,
                window.top as u32,
                window.width as u32,
                window.height as u32,
            )
            .to_image();
            let probs = self.inferencer.infer(&crop)?;
            accumulator.add(&window, probs.view());
        }

        let mean = accumulator.into_mean();
        let unpadded = mean.slice(s![
            pad_top..pad_top + scaled_h,
            pad_left..pad_left + scaled_w,
            ..
        ]);
        Ok(ops::resize_hwc(unpadded, out_h, out_w))
    }
}
