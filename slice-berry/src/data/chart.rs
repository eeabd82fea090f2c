//! 差异度曲线绘制.
//!
//! 横轴为切片编号, 纵轴为差异度. 额外画出平均值 (虚线) 与中位数 (点划线) 两条水平线,
//! 左上角标注纵轴, 右上角为图例, 底部标注横轴.

use std::path::Path;

use image::{GrayImage, ImageResult, Luma};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::warn;
use rusttype::{Font, Scale};

use super::score::ScoreSequence;
use crate::consts::gray::{BLACK, DARK_GRAY, GRAY, LIGHT_GRAY, WHITE};

/// 默认画布宽度.
const DEFAULT_WIDTH: u32 = 800;

/// 默认画布高度.
const DEFAULT_HEIGHT: u32 = 400;

/// 画布四周留白, 坐标轴标注与图例画在留白内.
const MARGIN: u32 = 32;

/// 网格水平线条数 (不含坐标轴).
const GRID_LINES: u32 = 4;

/// 标注字号 (像素).
const FONT_PX: f32 = 13.0;

/// 图例中线型示例的长度.
const LEGEND_SAMPLE: i32 = 20;

/// 平均值线: 长 5 空 3.
const MEAN_DASH: &[(i32, i32)] = &[(5, 3)];

/// 中位数线: 长 6 空 2, 点 1 空 3.
const MEDIAN_DASH: &[(i32, i32)] = &[(6, 2), (1, 3)];

static FONT_BYTES: &[u8] = include_bytes!("../../fonts/DejaVuSans.ttf");

/// 画好的差异度曲线 (单通道).
#[derive(Clone, Debug)]
pub struct ScoreChart {
    image: GrayImage,
}

impl ScoreChart {
    /// 以默认尺寸绘制 `seq`.
    #[inline]
    pub fn render(seq: &ScoreSequence) -> Self {
        Self::render_with_size(seq, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// 以 `width` x `height` 画布绘制 `seq`. 画布过小时会被放大到能容纳留白.
    pub fn render_with_size(seq: &ScoreSequence, width: u32, height: u32) -> Self {
        let width = width.max(MARGIN * 2 + 2);
        let height = height.max(MARGIN * 2 + 2);
        let mut image = GrayImage::from_pixel(width, height, Luma([WHITE]));
        let frame = Frame::new(width, height, seq);

        frame.draw_grid(&mut image);
        frame.draw_axes(&mut image);

        let mut legend = Vec::with_capacity(2);
        if let Some(mean) = seq.mean() {
            frame.draw_hline(&mut image, frame.y_of(mean), GRAY, MEAN_DASH);
            legend.push((format!("Mean: {mean:.3}"), GRAY, MEAN_DASH));
        }
        if let Some(median) = seq.median() {
            frame.draw_hline(&mut image, frame.y_of(median), DARK_GRAY, MEDIAN_DASH);
            legend.push((format!("Median: {median:.3}"), DARK_GRAY, MEDIAN_DASH));
        }

        let points: Vec<_> = seq
            .scores()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, &v)| (frame.x_of(i), frame.y_of(v)))
            .collect();
        for pair in points.windows(2) {
            draw_line_segment_mut(&mut image, f32_point(pair[0]), f32_point(pair[1]), Luma([BLACK]));
        }
        for &(x, y) in &points {
            draw_filled_rect_mut(&mut image, Rect::at(x - 1, y - 1).of_size(3, 3), Luma([BLACK]));
        }

        match Font::try_from_bytes(FONT_BYTES) {
            Some(font) => {
                let labels = Labels {
                    font,
                    scale: Scale::uniform(FONT_PX),
                };
                labels.draw_axis_labels(&mut image, &frame, &seq.metric().axis_label());
                labels.draw_legend(&mut image, &frame, &legend);
            }
            None => warn!("bundled font cannot be parsed, chart labels are skipped"),
        }

        Self { image }
    }

    /// 画好的图像.
    #[inline]
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// 消费自身, 返回图像.
    #[inline]
    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// 按 `path` 的扩展名保存图像, 通常为 `.png`.
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.image.save(path)
    }
}

#[inline]
fn f32_point((x, y): (i32, i32)) -> (f32, f32) {
    (x as f32, y as f32)
}

/// 水平虚线. `pattern` 为循环使用的 (实线长度, 空白长度) 序列.
fn draw_dashed_hline(image: &mut GrayImage, (x0, x1): (i32, i32), y: i32, color: u8, pattern: &[(i32, i32)]) {
    let mut x = x0;
    for &(on, off) in pattern.iter().cycle() {
        if x > x1 {
            break;
        }
        let end = (x + on - 1).min(x1);
        draw_line_segment_mut(image, f32_point((x, y)), f32_point((end, y)), Luma([color]));
        x += on + off;
    }
}

/// 数据坐标到画布坐标的映射.
struct Frame {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
    len: usize,
    lo: f64,
    span: f64,
}

impl Frame {
    fn new(width: u32, height: u32, seq: &ScoreSequence) -> Self {
        let (lo, hi) = seq
            .scores()
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (lo, span) = if lo > hi {
            (0.0, 1.0)
        } else if hi - lo <= f64::EPSILON {
            (lo - 0.5, 1.0)
        } else {
            (lo, hi - lo)
        };
        Self {
            left: MARGIN as i32,
            right: (width - MARGIN) as i32 - 1,
            top: MARGIN as i32,
            bottom: (height - MARGIN) as i32 - 1,
            len: seq.len(),
            lo,
            span,
        }
    }

    fn x_of(&self, i: usize) -> i32 {
        if self.len <= 1 {
            return (self.left + self.right) / 2;
        }
        let w = (self.right - self.left) as f64;
        self.left + (i as f64 * w / (self.len - 1) as f64).round() as i32
    }

    fn y_of(&self, v: f64) -> i32 {
        let h = (self.bottom - self.top) as f64;
        let t = ((v - self.lo) / self.span).clamp(0.0, 1.0);
        self.bottom - (t * h).round() as i32
    }

    fn draw_axes(&self, image: &mut GrayImage) {
        let origin = f32_point((self.left, self.bottom));
        let color = Luma([BLACK]);
        draw_line_segment_mut(image, origin, f32_point((self.right, self.bottom)), color);
        draw_line_segment_mut(image, origin, f32_point((self.left, self.top)), color);
    }

    fn draw_grid(&self, image: &mut GrayImage) {
        let h = self.bottom - self.top;
        for k in 1..=GRID_LINES as i32 {
            let y = self.bottom - h * k / GRID_LINES as i32;
            let (x0, x1) = (self.left + 1, self.right);
            draw_line_segment_mut(image, f32_point((x0, y)), f32_point((x1, y)), Luma([LIGHT_GRAY]));
        }
    }

    fn draw_hline(&self, image: &mut GrayImage, y: i32, color: u8, pattern: &[(i32, i32)]) {
        draw_dashed_hline(image, (self.left + 1, self.right), y, color, pattern);
    }
}

/// 文字标注.
struct Labels {
    font: Font<'static>,
    scale: Scale,
}

impl Labels {
    #[inline]
    fn size(&self, text: &str) -> (i32, i32) {
        text_size(self.scale, &self.font, text)
    }

    #[inline]
    fn draw(&self, image: &mut GrayImage, (x, y): (i32, i32), text: &str) {
        draw_text_mut(image, Luma([BLACK]), x, y, self.scale, &self.font, text);
    }

    /// 纵轴标注画在左上角留白内, 横轴标注居中画在底部留白内.
    fn draw_axis_labels(&self, image: &mut GrayImage, frame: &Frame, y_label: &str) {
        let (_, h) = self.size(y_label);
        self.draw(image, (frame.left, (frame.top - h) / 2), y_label);

        let x_label = "Slice";
        let (w, h) = self.size(x_label);
        let below = image.height() as i32 - frame.bottom;
        let pos = ((frame.left + frame.right - w) / 2, frame.bottom + (below - h) / 2);
        self.draw(image, pos, x_label);
    }

    /// 图例右对齐画在顶部留白内, 每项为线型示例加文字.
    fn draw_legend(&self, image: &mut GrayImage, frame: &Frame, entries: &[(String, u8, &[(i32, i32)])]) {
        const GAP: i32 = 6;
        const SPACING: i32 = 16;

        let sizes: Vec<_> = entries.iter().map(|(text, ..)| self.size(text)).collect();
        let total = sizes.iter().map(|(w, _)| LEGEND_SAMPLE + GAP + w).sum::<i32>()
            + SPACING * (entries.len() as i32 - 1).max(0);
        let mut x = frame.right - total;
        for ((text, color, pattern), &(w, h)) in entries.iter().zip(&sizes) {
            let y = (frame.top - h) / 2;
            draw_dashed_hline(image, (x, x + LEGEND_SAMPLE - 1), y + h / 2, *color, pattern);
            self.draw(image, (x + LEGEND_SAMPLE + GAP, y), text);
            x += LEGEND_SAMPLE + GAP + w + SPACING;
        }
    }
}
