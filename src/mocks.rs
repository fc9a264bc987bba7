use ndarray::prelude::*;

use crate::errors::{Result, SegError};
use crate::traits::SegmentationModel;

/// テスト用のモックセグメンテーションモデル
///
/// Scores each class from the matching input channel (classes beyond the
/// third get a constant low score), so a pure-color image maps to exactly one
/// winning class. `output_downscale` emits a spatially coarser score map to
/// exercise the upsampling correction path.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    classes: usize,
    output_downscale: usize,
}

impl MockSegmentationModel {
    pub const fn new(classes: usize) -> Self {
        Self {
            classes,
            output_downscale: 1,
        }
    }

    pub const fn with_output_downscale(mut self, downscale: usize) -> Self {
        self.output_downscale = downscale;
        self
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn predict(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (batch, channels, height, width) = input.dim();
        if channels != 3 {
            return Err(SegError::InvalidInput {
                reason: format!("expected 3 channels, got {}", channels),
            });
        }

        let ds = self.output_downscale.max(1);
        let out_h = (height / ds).max(1);
        let out_w = (width / ds).max(1);

        let mut scores = Array4::from_elem((batch, self.classes, out_h, out_w), -10.0f32);
        for n in 0..batch {
            for c in 0..self.classes.min(3) {
                for y in 0..out_h {
                    for x in 0..out_w {
                        scores[[n, c, y, x]] = input[[n, c, y * ds, x * ds]];
                    }
                }
            }
        }
        Ok(scores)
    }

    fn num_classes(&self) -> usize {
        self.classes
    }
}

/// 常に失敗するモックモデル（行単位のエラー処理テスト用）
#[derive(Debug, Clone)]
pub struct FailingSegmentationModel {
    classes: usize,
}

impl FailingSegmentationModel {
    pub const fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl SegmentationModel for FailingSegmentationModel {
    fn predict(&self, _input: ArrayView4<f32>) -> Result<Array4<f32>> {
        Err(SegError::Model {
            operation: "mock inference".to_string(),
            source: Box::new(std::io::Error::other("inference always fails")),
        })
    }

    fn num_classes(&self) -> usize {
        self.classes
    }
}
