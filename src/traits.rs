use crate::errors::Result;
use ndarray::prelude::*;

/// セグメンテーションモデルの抽象化
///
/// 依存関係逆転原則（DIP）に従い、具象クラスではなく抽象に依存する
///
/// The pipeline treats the model as an opaque callable: a float tensor of
/// shape `(N, 3, crop_h, crop_w)` maps to raw class scores of shape
/// `(N, C, h', w')` with `h' <= crop_h`, `w' <= crop_w`. Coarser outputs are
/// upsampled by the caller; the trait makes no promise about spatial size
/// beyond the batch and class dimensions.
pub trait SegmentationModel: Send + Sync {
    /// テンソル予測（低レベルAPI）
    fn predict(&self, input: ArrayView4<f32>) -> Result<Array4<f32>>;

    /// クラス数 C を取得
    fn num_classes(&self) -> usize;
}

impl std::fmt::Debug for dyn SegmentationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn SegmentationModel").finish_non_exhaustive()
    }
}

impl SegmentationModel for Box<dyn SegmentationModel> {
    fn predict(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        (**self).predict(input)
    }

    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }
}
