//! 一维差异度序列的局部极值检测, 以及基于它的训练切片选取.
//!
//! # 边界约定
//!
//! 判断位置 `i` 时, 邻居索引 `i - k` / `i + k` 会被截断到 `[0, N - 1]`.
//! 因此:
//!
//! 1. 首尾两点总会与自身比较, 永远不是极值;
//! 2. 靠近边界的内部点只需严格大于 (小于) 其范围内的邻居即可.

use crate::SliceNum;
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod error;
mod select;

pub use error::SelectError;
pub use select::{select, SelectionRequest};

#[cfg(feature = "rayon")]
pub use select::par_select;

/// 极值检测 / 阶数搜索运行时错误.
pub type SelectResult<T> = Result<T, SelectError>;

/// 极值比较方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    /// 严格大于所有邻居 (极大值).
    Greater,

    /// 严格小于所有邻居 (极小值).
    Less,
}

impl Direction {
    /// `center` 相对 `neighbour` 是否满足该比较方向.
    #[inline]
    pub fn holds<T: PartialOrd>(self, center: &T, neighbour: &T) -> bool {
        match self {
            Self::Greater => center > neighbour,
            Self::Less => center < neighbour,
        }
    }
}

/// 极值类别.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExtremaKind {
    /// 局部极大值, 即差异最大的切片.
    Max,

    /// 局部极小值, 即差异最小的切片.
    Min,
}

impl ExtremaKind {
    /// 对应的比较方向.
    #[inline]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Max => Direction::Greater,
            Self::Min => Direction::Less,
        }
    }

    /// 标签名, `"max"` 或 `"min"`.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

impl fmt::Display for ExtremaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 检测模式, 决定参与计数的极值类别.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// 仅极大值.
    Max,

    /// 仅极小值.
    Min,

    /// 极大值与极小值.
    #[default]
    Both,
}

impl Mode {
    /// 该模式下启用的极值类别, 按 `max`, `min` 顺序排列.
    #[inline]
    pub const fn kinds(self) -> &'static [ExtremaKind] {
        match self {
            Self::Max => &[ExtremaKind::Max],
            Self::Min => &[ExtremaKind::Min],
            Self::Both => &[ExtremaKind::Max, ExtremaKind::Min],
        }
    }

    /// 模式名, `"max"`, `"min"` 或 `"both"`.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析 [`Mode`] 失败. 参数为原始输入.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(pub String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mode `{}`, expected `max`, `min` or `both`", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "both" => Ok(Self::Both),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// 某一阶数下的极值检测结果.
///
/// 该结构是只读的值对象. 阶数变化时应重新检测, 而不是就地修改.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtremaResult {
    // 未启用的类别为 `None`, 启用但无极值为 `Some(vec![])`.
    max: Option<Vec<SliceNum>>,
    min: Option<Vec<SliceNum>>,
    order: usize,
    target_met: bool,
}

impl ExtremaResult {
    /// 获取某一类别的切片编号 (严格递增). 类别未启用时返回 `None`.
    #[inline]
    pub fn get(&self, kind: ExtremaKind) -> Option<&[SliceNum]> {
        match kind {
            ExtremaKind::Max => self.max.as_deref(),
            ExtremaKind::Min => self.min.as_deref(),
        }
    }

    /// 极大值切片编号.
    #[inline]
    pub fn maxima(&self) -> Option<&[SliceNum]> {
        self.get(ExtremaKind::Max)
    }

    /// 极小值切片编号.
    #[inline]
    pub fn minima(&self) -> Option<&[SliceNum]> {
        self.get(ExtremaKind::Min)
    }

    /// 按 `max`, `min` 顺序迭代已启用的类别.
    pub fn iter(&self) -> impl Iterator<Item = (ExtremaKind, &[SliceNum])> + '_ {
        [ExtremaKind::Max, ExtremaKind::Min]
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|v| (kind, v)))
    }

    /// 所有已启用类别的极值总数.
    #[inline]
    pub fn total(&self) -> usize {
        self.iter().map(|(_, v)| v.len()).sum()
    }

    /// 产生该结果的检测阶数.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// 极值总数是否达到了请求的切片数.
    ///
    /// 直接由 [`local_extrema_by_mode`] 得到的结果没有请求, 恒为 `false`.
    #[inline]
    pub fn target_met(&self) -> bool {
        self.target_met
    }

    /// 产生该结果的检测模式.
    pub fn mode(&self) -> Mode {
        match (self.max.is_some(), self.min.is_some()) {
            (true, false) => Mode::Max,
            (false, true) => Mode::Min,
            _ => Mode::Both,
        }
    }

    /// 合并所有类别后的切片编号, 升序.
    ///
    /// 同一位置不可能既是极大值又是极小值, 因此结果中没有重复.
    pub fn slices(&self) -> Vec<SliceNum> {
        let max = self.max.iter().flatten().copied();
        let min = self.min.iter().flatten().copied();
        max.merge(min).collect()
    }

    /// 按期望切片数 `desired` 标记是否达标.
    #[inline]
    pub(crate) fn judged(mut self, desired: usize) -> Self {
        self.target_met = self.total() >= desired;
        self
    }

    #[inline]
    pub(crate) fn unmet(mut self) -> Self {
        self.target_met = false;
        self
    }
}

/// 形如 `{max: [2, 4, 6], min: [3, 5]}`.
impl fmt::Display for ExtremaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self
            .iter()
            .map(|(kind, v)| format!("{kind}: [{}]", v.iter().join(", ")))
            .join(", ");
        write!(f, "{{{body}}}")
    }
}

/// 检测 `data` 中满足 `direction` 的 `order` 阶局部极值, 返回加上 `index_offset` 后的编号.
///
/// 结果严格递增; 没有任何极值时返回空序列. `order` 为 0 时返回
/// [`SelectError::InvalidOrder`]. 调用方负责保证 `order <= data.len() / 2`,
/// 超出时结果仍然合法, 只是不再有意义.
pub fn local_extrema<T: PartialOrd>(
    data: &[T],
    direction: Direction,
    order: usize,
    index_offset: SliceNum,
) -> SelectResult<Vec<SliceNum>> {
    if order == 0 {
        return Err(SelectError::InvalidOrder(order));
    }
    Ok(extrema_pos(data, direction, order)
        .into_iter()
        .map(|i| i as SliceNum + index_offset)
        .collect())
}

/// 按模式 `mode` 检测 `order` 阶局部极值并打包.
pub fn local_extrema_by_mode<T: PartialOrd>(
    data: &[T],
    mode: Mode,
    order: usize,
    index_offset: SliceNum,
) -> SelectResult<ExtremaResult> {
    let mut ans = ExtremaResult {
        max: None,
        min: None,
        order,
        target_met: false,
    };
    for &kind in mode.kinds() {
        let found = local_extrema(data, kind.direction(), order, index_offset)?;
        match kind {
            ExtremaKind::Max => ans.max = Some(found),
            ExtremaKind::Min => ans.min = Some(found),
        }
    }
    Ok(ans)
}

/// 局部极值的 0 起始位置. `order` 必须非 0.
fn extrema_pos<T: PartialOrd>(data: &[T], direction: Direction, order: usize) -> Vec<usize> {
    debug_assert_ne!(order, 0);
    let Some(last) = data.len().checked_sub(1) else {
        return Vec::new();
    };
    // 超过 `last` 的阶数只会重复比较已截断的端点.
    let order = order.min(last.max(1));

    data.iter()
        .enumerate()
        .filter(|&(i, center)| {
            (1..=order).all(|k| {
                let left = &data[i.saturating_sub(k)];
                let right = &data[i.saturating_add(k).min(last)];
                direction.holds(center, left) && direction.holds(center, right)
            })
        })
        .map(|(i, _)| i)
        .collect()
}
