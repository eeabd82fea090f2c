//! 选取运行时错误.

use super::ExtremaResult;
use std::error::Error;
use std::fmt;

/// 极值检测或阶数搜索的运行时错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// 检测阶数必须至少为 1. 参数为实际传入的阶数.
    ///
    /// 公开的选取入口不会产生该错误.
    InvalidOrder(usize),

    /// 请求不合法: 期望切片数不小于序列长度, 或序列为空.
    InvalidRequest {
        /// 期望切片数.
        desired: usize,

        /// 差异度序列长度.
        len: usize,
    },

    /// 即使最细的阶数 (1) 也无法得到足够多的极值.
    ///
    /// 携带阶数为 1 时的检测结果, 作为目前能做到的最好结果.
    InsufficientData(ExtremaResult),
}

impl SelectError {
    /// 获取错误所携带的 "尽力而为" 结果. 仅 [`SelectError::InsufficientData`] 有该结果.
    #[inline]
    pub fn best_effort(&self) -> Option<&ExtremaResult> {
        match self {
            Self::InsufficientData(r) => Some(r),
            _ => None,
        }
    }

    /// 同 `best_effort`, 但消费自身.
    #[inline]
    pub fn into_best_effort(self) -> Option<ExtremaResult> {
        match self {
            Self::InsufficientData(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrder(order) => write!(f, "detection order must be at least 1, got {order}"),
            Self::InvalidRequest { desired, len } if *len == 0 => {
                write!(f, "cannot select {desired} slices from an empty score sequence")
            }
            Self::InvalidRequest { desired, len } => write!(
                f,
                "the dataset is not large enough to select {desired} slices out of {len}"
            ),
            Self::InsufficientData(best) => write!(
                f,
                "only {} extrema exist at the finest order, provide more data or change mode",
                best.total()
            ),
        }
    }
}

impl Error for SelectError {}
