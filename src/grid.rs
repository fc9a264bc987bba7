/// Fixed crop size and stride fraction shared by every image in a run.
///
/// `stride_rate` is the fraction of the crop size between consecutive window
/// starts; the default 2/3 gives roughly one third overlap between neighbors.
#[derive(Debug, Clone, Copy)]
pub struct WindowSpec {
    pub crop_h: usize,
    pub crop_w: usize,
    pub stride_rate: f32,
}

impl WindowSpec {
    pub const DEFAULT_STRIDE_RATE: f32 = 2.0 / 3.0;

    pub const fn new(crop_h: usize, crop_w: usize, stride_rate: f32) -> Self {
        Self {
            crop_h,
            crop_w,
            stride_rate,
        }
    }
}

/// One rectangular sub-region of the padded scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl CropWindow {
    pub const fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub const fn right(&self) -> usize {
        self.left + self.width
    }
}

/// Plans the deterministic overlapping crop grid covering a padded image.
///
/// The grid is a pure function of the padded size and the window spec, so it
/// is recomputed per scale rather than cached. Windows whose nominal start
/// would overrun the image are shifted back so their end aligns exactly with
/// the boundary; the last row/column therefore overlaps its neighbor more
/// than the nominal stride, which guarantees every border pixel is covered.
///
/// The padded image must be at least `crop_h x crop_w`.
pub fn plan_windows(height: usize, width: usize, spec: &WindowSpec) -> Vec<CropWindow> {
    debug_assert!(height >= spec.crop_h && width >= spec.crop_w);

    let stride_h = (spec.crop_h as f32 * spec.stride_rate).ceil() as usize;
    let stride_w = (spec.crop_w as f32 * spec.stride_rate).ceil() as usize;

    let grid_h = grid_count(height, spec.crop_h, stride_h);
    let grid_w = grid_count(width, spec.crop_w, stride_w);

    let mut windows = Vec::with_capacity(grid_h * grid_w);
    for index_h in 0..grid_h {
        for index_w in 0..grid_w {
            let end_h = (index_h * stride_h + spec.crop_h).min(height);
            let end_w = (index_w * stride_w + spec.crop_w).min(width);
            windows.push(CropWindow {
                top: end_h - spec.crop_h,
                left: end_w - spec.crop_w,
                height: spec.crop_h,
                width: spec.crop_w,
            });
        }
    }
    windows
}

fn grid_count(size: usize, crop: usize, stride: usize) -> usize {
    if size <= crop {
        1
    } else {
        ((size - crop) as f32 / stride as f32).ceil() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage_counts(height: usize, width: usize, windows: &[CropWindow]) -> Vec<u32> {
        let mut counts = vec![0u32; height * width];
        for win in windows {
            for y in win.top..win.bottom() {
                for x in win.left..win.right() {
                    counts[y * width + x] += 1;
                }
            }
        }
        counts
    }

    #[test]
    fn test_exact_fit_yields_single_window() {
        let spec = WindowSpec::new(473, 473, WindowSpec::DEFAULT_STRIDE_RATE);
        let windows = plan_windows(473, 473, &spec);
        assert_eq!(
            windows,
            vec![CropWindow {
                top: 0,
                left: 0,
                height: 473,
                width: 473
            }]
        );
    }

    #[test]
    fn test_every_pixel_covered_and_in_bounds() {
        let spec = WindowSpec::new(64, 48, WindowSpec::DEFAULT_STRIDE_RATE);
        for &(h, w) in &[(64, 48), (65, 49), (100, 100), (200, 97), (473, 512)] {
            let windows = plan_windows(h, w, &spec);
            for win in &windows {
                assert!(win.bottom() <= h, "window overruns height at {}x{}", h, w);
                assert!(win.right() <= w, "window overruns width at {}x{}", h, w);
            }
            let counts = coverage_counts(h, w, &windows);
            assert!(
                counts.iter().all(|&c| c >= 1),
                "uncovered pixel at {}x{}",
                h,
                w
            );
        }
    }

    #[test]
    fn test_last_window_aligns_with_boundary() {
        let spec = WindowSpec::new(100, 100, WindowSpec::DEFAULT_STRIDE_RATE);
        let windows = plan_windows(150, 150, &spec);
        // stride = ceil(100 * 2/3) = 67, grid = ceil(50/67)+1 = 2 per axis
        assert_eq!(windows.len(), 4);
        let last = windows.last().unwrap();
        assert_eq!(last.bottom(), 150);
        assert_eq!(last.right(), 150);
        assert_eq!(last.top, 50);
        assert_eq!(last.left, 50);
    }

    #[test]
    fn test_stride_is_ceiled() {
        let spec = WindowSpec::new(10, 10, 2.0 / 3.0);
        // ceil(10 * 2/3) = 7
        let windows = plan_windows(17, 10, &spec);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].top, 7);
    }
}
