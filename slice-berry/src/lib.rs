#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 从序列编号的 3D 图像栈 (如 CT 扫描切片文件夹) 中,
//! 依据逐切片 "差异度" 曲线的局部极值, 选取具有代表性的训练切片.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 选取算法本身只接收一维差异度序列, 不关心序列如何得到.
//!   本 crate 额外提供了从图像文件夹 / nifti 文件计算该序列的方法.
//! 2. 所有公开的失败路径均以 `Result` 返回, 选取核心不会 panic.
//!
//! # 开发计划
//!
//! ### 局部极值检测 ✅
//!
//! 给定阶数 `order`, 检测严格大于 (小于) 两侧各 `order` 个邻居的位置.
//! 边界处的邻居索引被截断 (clamp) 到序列范围内, 因此首尾两点永远不是极值.
//!
//! 实现位于 `slice-berry/src/extrema/mod.rs`.
//!
//! ### 自适应阶数搜索 ✅
//!
//! 从最粗的阶数 `floor(N / 2)` 开始逐一递减, 找到第一个使极值总数不少于
//! 期望切片数的阶数. 不做二分, 不在单次不足时提前退出.
//! 阶数为 1 时极值总数不超过期望切片数则视为数据不足.
//!
//! 实现位于 `slice-berry/src/extrema/select.rs`.
//!
//! ### 差异度序列 ✅
//!
//! 平均图像 + 逐切片平均绝对差 / 均方差. 支持整卷加载和两遍流式计算.
//!
//! 实现位于 `slice-berry/src/data/score.rs`.
//!
//! ### 混淆矩阵统计 ✅
//!
//! 真值 / 预测体数据对比, 可选 ROI 掩膜.
//!
//! 实现位于 `slice-berry/src/stats`.
//!
//! ### 小功能 ✅
//!
//! 1. 按扩展名递归收集文件, 统计数据集大小, 按关键字查找子目录. ✅
//! 2. 差异度曲线绘制 (PNG), `plot` feature 下窗口展示. ✅
//! 3. 差异度表以 `.npy` 格式持久化. ✅

/// 二维索引 (高, 宽).
pub type Idx2d = (usize, usize);

/// 三维索引 (切片, 高, 宽).
pub type Idx3d = (usize, usize, usize);

/// 对外报告的切片编号. 已经加上了编号起点 `index_offset`, 因此可能为负.
pub type SliceNum = i64;

/// 图像栈加载与差异度计算.
mod data;

pub use data::score::{Metric, ParseMetricError, ScoreSequence, ScoreSequenceBuilder, ScoreStage};
pub use data::{LabelVolume, LoadError, LoadResult, ScoreChart, SliceStack};

#[cfg(feature = "plot")]
pub use data::ImgDisplay;

pub mod consts;

pub mod dataset;

pub mod extrema;

pub mod stats;

pub mod prelude;
