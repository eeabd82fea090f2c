//! 逐切片差异度序列.
//!
//! 每张切片的得分为它与整个图像栈平均图像之间的逐像素平均差异.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::info;
use ndarray::{Array2, ArrayView2, Zip};
use ndarray_npy::{write_npy, WriteNpyError};
use ordered_float::NotNan;

use super::{read_plane, LoadError, LoadResult, SliceStack};
use crate::consts::DEFAULT_INDEX_OFFSET;
use crate::extrema::{self, ExtremaResult, Mode, SelectResult, SelectionRequest};
use crate::SliceNum;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 切片与平均图像之间的差异度量.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Metric {
    /// 平均绝对差.
    MeanAbsolute,

    /// 均方差.
    #[default]
    MeanSquared,
}

impl Metric {
    /// 单个像素差 `diff` 的贡献.
    #[inline]
    pub fn eval(self, diff: f64) -> f64 {
        match self {
            Self::MeanAbsolute => diff.abs(),
            Self::MeanSquared => diff * diff,
        }
    }

    /// 度量名, `"mae"` 或 `"mse"`.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MeanAbsolute => "mae",
            Self::MeanSquared => "mse",
        }
    }

    /// 曲线图纵轴标注, 如 `"MSE to Average Image"`.
    pub fn axis_label(self) -> String {
        format!("{} to Average Image", self.as_str().to_uppercase())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析 [`Metric`] 失败. 参数为原始输入.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMetricError(pub String);

impl fmt::Display for ParseMetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid metric `{}`, expected `mae` or `mse`", self.0)
    }
}

impl std::error::Error for ParseMetricError {}

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mae" | "abs" => Ok(Self::MeanAbsolute),
            "mse" | "squared" => Ok(Self::MeanSquared),
            other => Err(ParseMetricError(other.to_string())),
        }
    }
}

/// 流式计算所处的阶段.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScoreStage {
    /// 第一遍: 累加平均图像.
    Summing,

    /// 第二遍: 计算每张切片的得分.
    Scoring,
}

/// 差异度序列, 每张切片一个得分, 并附带切片编号起点.
///
/// 内部以 0 起始索引, 对外报告时统一加上 `index_offset`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScoreSequence {
    scores: Vec<f64>,
    index_offset: SliceNum,
    metric: Metric,
}

impl ScoreSequence {
    /// 直接初始化. 度量记为默认的 [`Metric::MeanSquared`].
    #[inline]
    pub fn new(scores: Vec<f64>, index_offset: SliceNum) -> Self {
        Self {
            scores,
            index_offset,
            metric: Metric::default(),
        }
    }

    /// 替换得分所用的度量. 只影响展示.
    #[inline]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// 得分所用的度量.
    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// 替换切片编号起点.
    #[inline]
    pub fn with_index_offset(mut self, index_offset: SliceNum) -> Self {
        self.index_offset = index_offset;
        self
    }

    /// 所有得分.
    #[inline]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// 切片编号起点.
    #[inline]
    pub fn index_offset(&self) -> SliceNum {
        self.index_offset
    }

    /// 切片个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// 按顺序迭代对外的切片编号.
    pub fn slice_nums(&self) -> impl ExactSizeIterator<Item = SliceNum> + '_ {
        (0..self.len()).map(move |i| i as SliceNum + self.index_offset)
    }

    /// (切片编号, 得分) 表, 形状为 `(N, 2)`.
    pub fn table(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), 2), |(i, col)| match col {
            0 => (i as SliceNum + self.index_offset) as f64,
            _ => self.scores[i],
        })
    }

    /// 将 (切片编号, 得分) 表以 `.npy` 格式保存到 `path`.
    pub fn save_table<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        write_npy(path, &self.table())
    }

    /// 得分平均值. 序列为空时返回 `None`.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.scores.iter().sum::<f64>() / self.len() as f64)
    }

    /// 得分中位数. 偶数长度时取中间两数的平均值. NaN 不参与计算.
    pub fn median(&self) -> Option<f64> {
        let mut sorted: Vec<NotNan<f64>> = self
            .scores
            .iter()
            .filter_map(|&v| NotNan::new(v).ok())
            .collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let ans = if sorted.len() % 2 == 0 {
            (sorted[mid - 1].into_inner() + sorted[mid].into_inner()) / 2.0
        } else {
            sorted[mid].into_inner()
        };
        Some(ans)
    }

    /// 以模式 `mode` 选取至少 `desired` 张训练切片. 见 [`extrema::select`].
    #[inline]
    pub fn select(&self, desired: usize, mode: Mode) -> SelectResult<ExtremaResult> {
        extrema::select(&self.scores, &self.request(desired, mode))
    }

    /// 同 `select`, 但并行检测所有候选阶数. 见 [`extrema::par_select`].
    #[cfg(feature = "rayon")]
    #[inline]
    pub fn par_select(&self, desired: usize, mode: Mode) -> SelectResult<ExtremaResult> {
        extrema::par_select(&self.scores, &self.request(desired, mode))
    }

    /// 直接检测 `order` 阶局部极值, 不做搜索.
    #[inline]
    pub fn extrema_at(&self, mode: Mode, order: usize) -> SelectResult<ExtremaResult> {
        extrema::local_extrema_by_mode(&self.scores, mode, order, self.index_offset)
    }

    #[inline]
    fn request(&self, desired: usize, mode: Mode) -> SelectionRequest {
        SelectionRequest::new(desired, mode, self.index_offset)
    }
}

/// 差异度序列构造器.
#[derive(Copy, Clone, Debug)]
pub struct ScoreSequenceBuilder {
    metric: Metric,
    index_offset: SliceNum,
}

impl Default for ScoreSequenceBuilder {
    fn default() -> Self {
        Self::new(Metric::default())
    }
}

impl ScoreSequenceBuilder {
    /// 以度量 `metric` 和默认编号起点初始化.
    #[inline]
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            index_offset: DEFAULT_INDEX_OFFSET,
        }
    }

    /// 设置切片编号起点.
    #[inline]
    pub fn index_offset(mut self, index_offset: SliceNum) -> Self {
        self.index_offset = index_offset;
        self
    }

    /// 当前度量.
    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// 从已加载的图像栈计算差异度序列.
    pub fn from_stack(&self, stack: &SliceStack) -> ScoreSequence {
        let mean = stack.mean_image();
        let scores = stack
            .slice_iter()
            .map(|s| slice_score(s, mean.view(), self.metric))
            .collect();
        ScoreSequence::new(scores, self.index_offset).with_metric(self.metric)
    }

    /// 借助 `rayon`, 并行地从已加载的图像栈计算差异度序列. 结果顺序不变.
    #[cfg(feature = "rayon")]
    pub fn par_from_stack(&self, stack: &SliceStack) -> ScoreSequence {
        use ndarray::Axis;
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        let mean = stack.mean_image();
        let metric = self.metric;
        let scores = stack
            .data()
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|s| slice_score(s, mean.view(), metric))
            .collect();
        ScoreSequence::new(scores, self.index_offset).with_metric(self.metric)
    }

    /// 流式地从图像文件计算差异度序列, 不会把整个图像栈读入内存.
    #[inline]
    pub fn from_paths<P: AsRef<Path>>(&self, paths: &[P]) -> LoadResult<ScoreSequence> {
        self.from_paths_with(paths, |_, _| {})
    }

    /// 同 `from_paths`, 每处理完一张切片就以 (阶段, 已完成张数) 调用一次 `progress`.
    ///
    /// 计算分两遍: 第一遍累加平均图像, 第二遍逐张计算得分. 每张图像因此会被读取两次.
    pub fn from_paths_with<P, F>(&self, paths: &[P], mut progress: F) -> LoadResult<ScoreSequence>
    where
        P: AsRef<Path>,
        F: FnMut(ScoreStage, usize),
    {
        let mut sum: Option<Array2<f64>> = None;
        for (i, p) in paths.iter().enumerate() {
            let plane = read_plane::<f32>(p.as_ref())?;
            let acc = sum.get_or_insert_with(|| Array2::zeros(plane.dim()));
            check_shape(acc.dim(), plane.dim(), p.as_ref())?;
            Zip::from(acc).and(&plane).for_each(|a, &v| *a += v as f64);
            progress(ScoreStage::Summing, i + 1);
        }
        let mean = sum.ok_or(LoadError::EmptyStack)? / paths.len() as f64;
        info!("mean image computed over {} slices", paths.len());

        let mut scores = Vec::with_capacity(paths.len());
        for (i, p) in paths.iter().enumerate() {
            let plane = read_plane::<f32>(p.as_ref())?;
            check_shape(mean.dim(), plane.dim(), p.as_ref())?;
            scores.push(slice_score(plane.view(), mean.view(), self.metric));
            progress(ScoreStage::Scoring, i + 1);
        }
        Ok(ScoreSequence::new(scores, self.index_offset).with_metric(self.metric))
    }
}

#[inline]
fn check_shape(expected: (usize, usize), found: (usize, usize), path: &Path) -> LoadResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(LoadError::SliceShapeMismatch {
            expected,
            found,
            path: path.to_owned(),
        })
    }
}

/// 切片 `slice` 与平均图像 `mean` 的逐像素平均差异.
fn slice_score(slice: ArrayView2<f32>, mean: ArrayView2<f64>, metric: Metric) -> f64 {
    if slice.is_empty() {
        return 0.0;
    }
    let total = Zip::from(&slice)
        .and(&mean)
        .fold(0.0, |acc, &p, &m| acc + metric.eval(p as f64 - m));
    total / slice.len() as f64
}
