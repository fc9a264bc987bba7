//! Tensor primitives shared by the inference pipeline.
//!
//! Two bilinear variants exist on purpose: model outputs are corrected to the
//! crop size with aligned corners (matching how dense-prediction networks are
//! trained to upsample their logits), while prediction maps are resized
//! between image resolutions with half-pixel centers (matching standard image
//! resampling).

use ndarray::prelude::*;

/// In-place softmax over the class axis of an `(N, C, H, W)` score tensor.
pub fn softmax_classes(scores: &mut Array4<f32>) {
    for mut item in scores.axis_iter_mut(Axis(0)) {
        let (classes, height, width) = item.dim();
        for y in 0..height {
            for x in 0..width {
                let mut max = f32::NEG_INFINITY;
                for c in 0..classes {
                    max = max.max(item[[c, y, x]]);
                }
                let mut sum = 0.0;
                for c in 0..classes {
                    let e = (item[[c, y, x]] - max).exp();
                    item[[c, y, x]] = e;
                    sum += e;
                }
                for c in 0..classes {
                    item[[c, y, x]] /= sum;
                }
            }
        }
    }
}

/// Horizontal mirror of a `(C, H, W)` tensor, returned in standard layout.
pub fn hflip_chw(input: ArrayView3<f32>) -> Array3<f32> {
    input
        .slice(s![.., .., ..;-1])
        .as_standard_layout()
        .to_owned()
}

/// Bilinear resize of a `(C, H, W)` tensor with aligned corners.
///
/// Corner pixels of input and output coincide exactly, so upsampling a coarse
/// score map back to the crop size keeps boundary scores anchored.
pub fn resize_chw_align_corners(input: ArrayView3<f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let (classes, in_h, in_w) = input.dim();
    if (in_h, in_w) == (out_h, out_w) {
        return input.to_owned();
    }

    let scale_y = axis_scale_aligned(in_h, out_h);
    let scale_x = axis_scale_aligned(in_w, out_w);

    let mut output = Array3::<f32>::zeros((classes, out_h, out_w));
    for y in 0..out_h {
        let (y0, y1, fy) = sample_coords(y as f32 * scale_y, in_h);
        for x in 0..out_w {
            let (x0, x1, fx) = sample_coords(x as f32 * scale_x, in_w);
            for c in 0..classes {
                let top = input[[c, y0, x0]] * (1.0 - fx) + input[[c, y0, x1]] * fx;
                let bottom = input[[c, y1, x0]] * (1.0 - fx) + input[[c, y1, x1]] * fx;
                output[[c, y, x]] = top * (1.0 - fy) + bottom * fy;
            }
        }
    }
    output
}

/// Bilinear resize of an `(H, W, C)` map with half-pixel sample centers.
pub fn resize_hwc(input: ArrayView3<f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let (in_h, in_w, classes) = input.dim();
    if (in_h, in_w) == (out_h, out_w) {
        return input.to_owned();
    }

    let scale_y = in_h as f32 / out_h as f32;
    let scale_x = in_w as f32 / out_w as f32;

    let mut output = Array3::<f32>::zeros((out_h, out_w, classes));
    for y in 0..out_h {
        let src_y = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (in_h - 1) as f32);
        let (y0, y1, fy) = sample_coords(src_y, in_h);
        for x in 0..out_w {
            let src_x = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (in_w - 1) as f32);
            let (x0, x1, fx) = sample_coords(src_x, in_w);
            for c in 0..classes {
                let top = input[[y0, x0, c]] * (1.0 - fx) + input[[y0, x1, c]] * fx;
                let bottom = input[[y1, x0, c]] * (1.0 - fx) + input[[y1, x1, c]] * fx;
                output[[y, x, c]] = top * (1.0 - fy) + bottom * fy;
            }
        }
    }
    output
}

/// Per-pixel argmax over the class axis of an `(H, W, C)` map.
///
/// Ties resolve to the lowest class index.
pub fn argmax_classes(probs: ArrayView3<f32>) -> Array2<usize> {
    let (height, width, classes) = probs.dim();
    let mut labels = Array2::<usize>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            let mut best = 0;
            let mut best_score = probs[[y, x, 0]];
            for c in 1..classes {
                let score = probs[[y, x, c]];
                if score > best_score {
                    best_score = score;
                    best = c;
                }
            }
            labels[[y, x]] = best;
        }
    }
    labels
}

fn axis_scale_aligned(in_size: usize, out_size: usize) -> f32 {
    if out_size <= 1 {
        0.0
    } else {
        (in_size - 1) as f32 / (out_size - 1) as f32
    }
}

fn sample_coords(src: f32, in_size: usize) -> (usize, usize, f32) {
    let low = src.floor() as usize;
    let low = low.min(in_size - 1);
    let high = (low + 1).min(in_size - 1);
    (low, high, src - low as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let mut scores =
            Array4::from_shape_fn((2, 4, 3, 3), |(n, c, y, x)| (n + c * 2 + y + x) as f32 * 0.3);
        softmax_classes(&mut scores);
        for n in 0..2 {
            for y in 0..3 {
                for x in 0..3 {
                    let sum: f32 = (0..4).map(|c| scores[[n, c, y, x]]).sum();
                    assert!((sum - 1.0).abs() < 1e-5);
                    assert!((0..4).all(|c| scores[[n, c, y, x]] >= 0.0));
                }
            }
        }
    }

    #[test]
    fn test_softmax_is_stable_for_large_scores() {
        let mut scores = Array4::from_elem((1, 2, 1, 1), 1000.0);
        scores[[0, 1, 0, 0]] = 1001.0;
        softmax_classes(&mut scores);
        let sum = scores[[0, 0, 0, 0]] + scores[[0, 1, 0, 0]];
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores[[0, 1, 0, 0]] > scores[[0, 0, 0, 0]]);
    }

    #[test]
    fn test_hflip_is_involutive() {
        let tensor = Array3::from_shape_fn((2, 3, 4), |(c, y, x)| (c * 12 + y * 4 + x) as f32);
        let twice = hflip_chw(hflip_chw(tensor.view()).view());
        assert_eq!(tensor, twice);
        let once = hflip_chw(tensor.view());
        assert_eq!(once[[0, 0, 0]], tensor[[0, 0, 3]]);
    }

    #[test]
    fn test_resize_identity_when_same_size() {
        let tensor = Array3::from_shape_fn((2, 5, 4), |(c, y, x)| (c + y * x) as f32);
        assert_eq!(resize_chw_align_corners(tensor.view(), 5, 4), tensor);

        let map = Array3::from_shape_fn((5, 4, 2), |(y, x, c)| (c + y * x) as f32);
        assert_eq!(resize_hwc(map.view(), 5, 4), map);
    }

    #[test]
    fn test_align_corners_preserves_endpoints() {
        let mut tensor = Array3::<f32>::zeros((1, 2, 2));
        tensor[[0, 0, 0]] = 1.0;
        tensor[[0, 1, 1]] = 3.0;
        let up = resize_chw_align_corners(tensor.view(), 5, 5);
        assert!((up[[0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((up[[0, 4, 4]] - 3.0).abs() < 1e-6);
        assert!((up[[0, 4, 0]] - 0.0).abs() < 1e-6);
        // midpoint interpolates linearly between all four corners
        assert!((up[[0, 2, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hwc_resize_preserves_constant_maps() {
        let map = Array3::from_elem((7, 5, 3), 0.25);
        let resized = resize_hwc(map.view(), 13, 11);
        assert_eq!(resized.dim(), (13, 11, 3));
        assert!(resized.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_argmax_ties_resolve_low() {
        let mut probs = Array3::from_elem((1, 2, 3), 0.5);
        probs[[0, 1, 2]] = 0.9;
        let labels = argmax_classes(probs.view());
        assert_eq!(labels[[0, 0]], 0);
        assert_eq!(labels[[0, 1]], 2);
    }
}
