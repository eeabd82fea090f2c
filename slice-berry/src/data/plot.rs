//! 图片窗口展示, 主要用于交互式选取时查看差异度曲线.
//!
//! # 注意
//!
//! 需要 `plot` feature.

use super::chart::ScoreChart;
use opencv::highgui::{imshow, wait_key};
use opencv::prelude::{Mat, MatTraitConst};
use std::time::Duration;

/// 窗口标题.
const WINDOW_NAME: &str = "Scores";

/// 表明一个可以在窗口中可视化的对象.
pub trait ImgDisplay {
    /// 展示对象.
    fn show(&self) -> opencv::Result<()>;

    /// 同 `show()`, 但在之后自动等待一次用户按键输入.
    fn show_and_wait(&self) -> opencv::Result<i32> {
        self.show()?;
        wait_key(0)
    }

    /// 同 `show()`, 但在之后自动等待给定时间. 超过 `i32::MAX` 毫秒的时长会被截断.
    fn show_and_wait_for(&self, d: Duration) -> opencv::Result<i32> {
        self.show()?;
        let ms = d.as_millis().min(i32::MAX as u128);
        wait_key(ms as i32)
    }
}

impl ImgDisplay for ScoreChart {
    fn show(&self) -> opencv::Result<()> {
        let image = self.image();
        let (w, h) = image.dimensions();
        let mat = Mat::from_slice_rows_cols(image.as_raw(), h as usize, w as usize)?;
        debug_assert_eq!(mat.rows(), h as i32);
        imshow(WINDOW_NAME, &mat)
    }
}
