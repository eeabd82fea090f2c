//! 分割结果评估: 真值 / 预测体数据之间的混淆矩阵及其派生统计量.
//!
//! # 注意
//!
//! 只有取值为 `0` 或 `pos_label` 的体素对参与计数, 其余的体素对记入 `ignored`.

use std::error::Error;
use std::fmt;

use ndarray::{ArrayView3, Zip};

use crate::consts::NEGATIVE_LABEL;
use crate::{Idx3d, LabelVolume};

mod report;

pub use report::ConfusionStats;

/// 统计运行时错误.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatsError {
    /// 真值与预测的形状不同.
    ShapeMismatch {
        /// 真值形状.
        ground_truth: Idx3d,

        /// 预测形状.
        predicted: Idx3d,
    },

    /// 掩膜体素数与数据不同.
    MaskShapeMismatch {
        /// 数据体素数.
        expected: usize,

        /// 掩膜体素数.
        found: usize,
    },
}

/// 统计运行时结果.
pub type StatsResult<T> = Result<T, StatsError>;

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                ground_truth,
                predicted,
            } => write!(
                f,
                "datasets are not the same size: ground truth {ground_truth:?}, predicted {predicted:?}"
            ),
            Self::MaskShapeMismatch { expected, found } => write!(
                f,
                "mask dimensions don't match the datasets: {found} voxels, expected {expected}"
            ),
        }
    }
}

impl Error for StatsError {}

/// 2x2 混淆矩阵.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ConfusionMatrix {
    /// 真阳性.
    pub tp: u64,

    /// 假阳性.
    pub fp: u64,

    /// 假阴性.
    pub fn_: u64,

    /// 真阴性.
    pub tn: u64,

    /// 取值不在 `{0, pos_label}` 中而被忽略的体素对.
    pub ignored: u64,
}

impl ConfusionMatrix {
    /// 参与计数的体素总数.
    #[inline]
    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.fn_ + self.tn
    }

    /// 记录一对 (真值, 预测).
    #[inline]
    fn record(&mut self, truth: u16, pred: u16, pos_label: u16) {
        let as_bool = |v: u16| match v {
            v if v == pos_label => Some(true),
            NEGATIVE_LABEL => Some(false),
            _ => None,
        };
        match (as_bool(truth), as_bool(pred)) {
            (Some(true), Some(true)) => self.tp += 1,
            (Some(false), Some(true)) => self.fp += 1,
            (Some(true), Some(false)) => self.fn_ += 1,
            (Some(false), Some(false)) => self.tn += 1,
            _ => self.ignored += 1,
        }
    }
}

/// 计算真值 `ground_truth` 与预测 `predicted` 之间的混淆矩阵.
///
/// 给定掩膜 `mask` 时, 只统计掩膜值等于 `pos_label` 的位置. 掩膜与数据按逻辑顺序
/// 逐体素对应, 只要求体素数相同.
///
/// 返回混淆矩阵与 ROI 体素数 (没有掩膜时为 `None`).
///
/// `pos_label` 不应为背景值 0, 否则所有背景体素都会被计为阳性.
pub fn confusion_matrix(
    ground_truth: ArrayView3<u16>,
    predicted: ArrayView3<u16>,
    pos_label: u16,
    mask: Option<ArrayView3<u16>>,
) -> StatsResult<(ConfusionMatrix, Option<u64>)> {
    if ground_truth.dim() != predicted.dim() {
        return Err(StatsError::ShapeMismatch {
            ground_truth: ground_truth.dim(),
            predicted: predicted.dim(),
        });
    }

    let mut cm = ConfusionMatrix::default();
    let Some(mask) = mask else {
        Zip::from(&ground_truth)
            .and(&predicted)
            .for_each(|&t, &p| cm.record(t, p, pos_label));
        return Ok((cm, None));
    };

    if mask.len() != ground_truth.len() {
        return Err(StatsError::MaskShapeMismatch {
            expected: ground_truth.len(),
            found: mask.len(),
        });
    }
    let mut roi = 0;
    let pairs = ground_truth.iter().zip(predicted.iter());
    for ((&t, &p), _) in pairs.zip(mask.iter()).filter(|&(_, &m)| m == pos_label) {
        roi += 1;
        cm.record(t, p, pos_label);
    }
    Ok((cm, Some(roi)))
}

/// 同 `confusion_matrix`, 但直接接收标签体数据, 并计算派生统计量.
pub fn evaluate(
    ground_truth: &LabelVolume,
    predicted: &LabelVolume,
    pos_label: u16,
    mask: Option<&LabelVolume>,
) -> StatsResult<ConfusionStats> {
    let (cm, roi) = confusion_matrix(
        ground_truth.data(),
        predicted.data(),
        pos_label,
        mask.map(LabelVolume::data),
    )?;
    Ok(ConfusionStats::new(cm, roi))
}
