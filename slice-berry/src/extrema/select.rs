//! 自适应阶数搜索.

use super::{local_extrema_by_mode, ExtremaResult, Mode, SelectError, SelectResult};
use crate::consts::DEFAULT_INDEX_OFFSET;
use crate::SliceNum;
use log::debug;

/// 选取请求.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SelectionRequest {
    /// 期望的训练切片数. 0 表示只需要阶数为 1 的结果, 不做搜索.
    pub desired: usize,

    /// 检测模式.
    pub mode: Mode,

    /// 切片编号起点, 通常为 0 或 1.
    pub index_offset: SliceNum,
}

impl SelectionRequest {
    /// 直接初始化.
    #[inline]
    pub fn new(desired: usize, mode: Mode, index_offset: SliceNum) -> Self {
        Self {
            desired,
            mode,
            index_offset,
        }
    }

    /// 以 [`Mode::Both`] 和默认编号起点请求 `desired` 个切片.
    #[inline]
    pub fn with_desired(desired: usize) -> Self {
        Self::new(desired, Mode::Both, DEFAULT_INDEX_OFFSET)
    }
}

/// 找到使极值总数不少于 `request.desired` 的最大阶数, 并返回该阶数下的检测结果.
///
/// 算法流程依次为:
///
/// 1. `desired >= N` (包括 `N == 0`) 时直接返回 [`SelectError::InvalidRequest`].
/// 2. 检测阶数为 1 的结果. 若 `desired == 0`, 直接返回它.
///   若其总数不超过 `desired`, 返回携带该结果的 [`SelectError::InsufficientData`],
///   该结果的 `target_met()` 为 `false`.
/// 3. 否则从 `floor(N / 2)` 起逐一递减阶数, 返回第一个达标的结果.
///   搜索不假设总数随阶数单调, 也不会因某一阶数不足而提前退出.
///   阶数降到 0 仍未达标时, 返回最后一次的结果, 其 `target_met()` 为 `false`.
pub fn select<T: PartialOrd>(scores: &[T], request: &SelectionRequest) -> SelectResult<ExtremaResult> {
    SelectImp::new(scores, *request).run()
}

/// 同 [`select`], 但借助 `rayon` 并行地检测所有候选阶数.
///
/// 结果与 [`select`] 完全一致: 仍按由粗到细的顺序取第一个达标的阶数.
#[cfg(feature = "rayon")]
pub fn par_select<T: PartialOrd + Sync>(
    scores: &[T],
    request: &SelectionRequest,
) -> SelectResult<ExtremaResult> {
    SelectImp::new(scores, *request).par_run()
}

struct SelectImp<'a, T> {
    scores: &'a [T],
    request: SelectionRequest,
}

impl<'a, T: PartialOrd> SelectImp<'a, T> {
    fn new(scores: &'a [T], request: SelectionRequest) -> Self {
        Self { scores, request }
    }

    fn run(&self) -> SelectResult<ExtremaResult> {
        let finest = match self.prepare()? {
            Prepared::Done(r) => return Ok(r),
            Prepared::Search(finest) => finest,
        };

        let mut last = finest;
        for order in (1..=self.max_order()).rev() {
            let trial = self.trial(order)?;
            if trial.target_met() {
                return Ok(trial);
            }
            last = trial;
        }
        Ok(last)
    }

    /// 校验请求并处理无需搜索的情形.
    fn prepare(&self) -> SelectResult<Prepared> {
        let len = self.scores.len();
        let desired = self.request.desired;
        if len == 0 || desired >= len {
            return Err(SelectError::InvalidRequest { desired, len });
        }

        let finest = self.trial(1)?;
        if desired == 0 {
            return Ok(Prepared::Done(finest));
        }
        // 阶数为 1 时恰好等于 `desired` 也视为数据不足: 没有可供提高阶数筛选的余量.
        if finest.total() <= desired {
            debug!(
                "order 1 yields {} extrema, no more than the {desired} requested",
                finest.total()
            );
            return Err(SelectError::InsufficientData(finest.unmet()));
        }
        Ok(Prepared::Search(finest))
    }

    /// 最粗的候选阶数.
    #[inline]
    fn max_order(&self) -> usize {
        self.scores.len() / 2
    }

    fn trial(&self, order: usize) -> SelectResult<ExtremaResult> {
        let SelectionRequest {
            desired,
            mode,
            index_offset,
        } = self.request;
        let r = local_extrema_by_mode(self.scores, mode, order, index_offset)?.judged(desired);
        debug!("order {order}: {} extrema ({mode})", r.total());
        Ok(r)
    }
}

enum Prepared {
    /// 已有最终结果.
    Done(ExtremaResult),

    /// 需要搜索. 携带阶数为 1 的结果.
    Search(ExtremaResult),
}

#[cfg(feature = "rayon")]
impl<'a, T: PartialOrd + Sync> SelectImp<'a, T> {
    fn par_run(&self) -> SelectResult<ExtremaResult> {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

        let finest = match self.prepare()? {
            Prepared::Done(r) => return Ok(r),
            Prepared::Search(finest) => finest,
        };

        // 由粗到细排列.
        let trials = (1..self.max_order() + 1)
            .into_par_iter()
            .rev()
            .map(|order| self.trial(order))
            .collect::<SelectResult<Vec<_>>>()?;

        Ok(trials
            .into_iter()
            .find(ExtremaResult::target_met)
            .unwrap_or(finest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: [f64; 7] = [1.0, 5.0, 2.0, 8.0, 3.0, 9.0, 1.0];

    /// 阶数 1 有 5 个极大值, 阶数 3 时恰好剩 3 个.
    const STAIRS: [f64; 11] = [0.0, 5.0, 0.0, 1.0, 0.0, 6.0, 0.0, 1.0, 0.0, 7.0, 0.0];

    fn tent(n: usize) -> Vec<f64> {
        let peak = n / 2;
        (0..n).map(|i| (peak - peak.abs_diff(i)) as f64).collect()
    }

    #[test]
    fn test_scenario_both_three() {
        let r = select(&SCENARIO, &SelectionRequest::new(3, Mode::Both, 1)).unwrap();
        assert_eq!(r.order(), 1);
        assert_eq!(r.maxima(), Some([2, 4, 6].as_slice()));
        assert_eq!(r.minima(), Some([3, 5].as_slice()));
        assert_eq!(r.total(), 5);
        assert!(r.target_met());
    }

    #[test]
    fn test_exact_count_at_order_one_is_insufficient() {
        let err = select(&SCENARIO, &SelectionRequest::new(3, Mode::Max, 1)).unwrap_err();
        assert!(matches!(err, SelectError::InsufficientData(_)));
        let best = err.into_best_effort().unwrap();
        assert_eq!(best.order(), 1);
        assert_eq!(best.maxima(), Some([2, 4, 6].as_slice()));
        assert_eq!(best.minima(), None);
        assert_eq!(best.total(), 3);
        assert!(!best.target_met());

        // 多出一个即可进入搜索.
        let r = select(&SCENARIO, &SelectionRequest::new(2, Mode::Max, 1)).unwrap();
        assert!(r.target_met());
    }

    #[test]
    fn test_search_stops_at_coarsest_sufficient_order() {
        let _ = simple_logger::init_with_level(log::Level::Debug);

        let r = select(&STAIRS, &SelectionRequest::new(3, Mode::Max, 0)).unwrap();
        assert_eq!(r.order(), 3);
        assert_eq!(r.maxima(), Some([1, 5, 9].as_slice()));
        assert!(r.target_met());

        let r = select(&STAIRS, &SelectionRequest::new(4, Mode::Max, 0)).unwrap();
        assert_eq!(r.order(), 1);
        assert_eq!(r.maxima(), Some([1, 3, 5, 7, 9].as_slice()));

        let r = select(&STAIRS, &SelectionRequest::new(1, Mode::Max, 0)).unwrap();
        assert_eq!(r.order(), 5);
        assert_eq!(r.maxima(), Some([9].as_slice()));
    }

    #[test]
    fn test_desired_not_less_than_len_is_invalid() {
        let data = [1.0, 3.0, 2.0, 4.0];
        let err = select(&data, &SelectionRequest::with_desired(4)).unwrap_err();
        assert_eq!(err, SelectError::InvalidRequest { desired: 4, len: 4 });
        assert!(err.best_effort().is_none());

        let empty: [f64; 0] = [];
        let err = select(&empty, &SelectionRequest::with_desired(0)).unwrap_err();
        assert_eq!(err, SelectError::InvalidRequest { desired: 0, len: 0 });
    }

    #[test]
    fn test_insufficient_data_carries_order_one() {
        let data = tent(7);
        let err = select(&data, &SelectionRequest::new(6, Mode::Both, 1)).unwrap_err();
        let best = err.best_effort().unwrap();
        assert_eq!(best.order(), 1);
        assert_eq!(best.maxima(), Some([4].as_slice()));
        assert_eq!(best.minima(), Some([].as_slice()));
        assert!(!best.target_met());
        assert!(matches!(err, SelectError::InsufficientData(_)));
    }

    #[test]
    fn test_zero_desired_returns_order_one() {
        let r = select(&STAIRS, &SelectionRequest::new(0, Mode::Both, 1)).unwrap();
        assert_eq!(r.order(), 1);
        assert_eq!(r.maxima(), Some([2, 4, 6, 8, 10].as_slice()));
        assert_eq!(r.minima(), Some([3, 5, 7, 9].as_slice()));
        assert!(r.target_met());

        // 单个切片只能请求 0 个.
        let r = select(&[42.0], &SelectionRequest::with_desired(0)).unwrap();
        assert_eq!(r.total(), 0);
    }

    #[test]
    fn test_select_is_pure() {
        let request = SelectionRequest::new(2, Mode::Both, 1);
        let a = select(&STAIRS, &request);
        let b = select(&STAIRS, &request);
        assert_eq!(a, b);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_select_matches_select() {
        let data: Vec<f64> = (0..200)
            .map(|i| (i as f64 * 0.21).sin() * 5.0 + (i as f64 * 1.7).cos())
            .collect();
        for desired in [0, 1, 3, 10, 25, 60, 150, 199, 200] {
            for mode in [Mode::Max, Mode::Min, Mode::Both] {
                let request = SelectionRequest::new(desired, mode, 1);
                assert_eq!(
                    par_select(&data, &request),
                    select(&data, &request),
                    "desired {desired}, mode {mode}"
                );
            }
        }
    }
}
