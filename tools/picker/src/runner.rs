//! 交互式选取会话.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use log::info;
use slice_berry::extrema::{ExtremaResult, Mode, SelectError};
use slice_berry::{ScoreChart, ScoreSequence, SliceNum};

#[cfg(feature = "plot")]
use slice_berry::ImgDisplay;

const MAIN_PROMPT: &str =
    "Enter the desired number of slices (p: plot, 0: change mode, -1: exit): ";

/// 一行用户输入.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    /// 绘制差异度曲线.
    Plot,

    /// 切换检测模式.
    ChangeMode,

    /// 结束会话.
    Exit,

    /// 选取给定数目的切片.
    Select(usize),
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("p") {
            return Ok(Self::Plot);
        }
        match s.parse::<i64>() {
            Ok(-1) => Ok(Self::Exit),
            Ok(0) => Ok(Self::ChangeMode),
            Ok(n) if n > 0 => Ok(Self::Select(n as usize)),
            _ => Err(format!("`{s}` is not a valid input")),
        }
    }
}

/// 打印 `prompt` 并读取一行. 输入结束时返回 `None`.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> anyhow::Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// 询问切片编号起点. 空输入取 `default`, 无法解析时重新询问.
pub fn prompt_index_offset<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    default: SliceNum,
) -> anyhow::Result<SliceNum> {
    let prompt = format!("Index offset of the first slice [{default}]: ");
    loop {
        let Some(line) = prompt_line(input, out, &prompt)? else {
            return Ok(default);
        };
        if line.is_empty() {
            return Ok(default);
        }
        match line.parse() {
            Ok(v) => return Ok(v),
            Err(_) => writeln!(out, "`{line}` is not an integer")?,
        }
    }
}

/// 交互式选取会话. 只持有不可变的差异度序列, 当前模式和最近一次的结果.
pub struct Session<'a> {
    seq: &'a ScoreSequence,
    mode: Mode,
    latest: Option<ExtremaResult>,
    chart_path: PathBuf,
    show: bool,
}

impl<'a> Session<'a> {
    /// 初始化. 曲线会保存到 `chart_path`; `show` 为 `true` 时额外在窗口中展示.
    pub fn new(seq: &'a ScoreSequence, mode: Mode, chart_path: PathBuf, show: bool) -> Self {
        Self {
            seq,
            mode,
            latest: None,
            chart_path,
            show,
        }
    }

    /// 当前模式.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// 运行会话直到用户退出或输入结束.
    ///
    /// 返回最近一次的选取结果; 从未选取过时, 返回当前模式下阶数为 1 的结果.
    pub fn run<R: BufRead, W: Write>(mut self, mut input: R, mut out: W) -> anyhow::Result<ExtremaResult> {
        while let Some(line) = prompt_line(&mut input, &mut out, MAIN_PROMPT)? {
            let cmd = match line.parse::<Command>() {
                Ok(cmd) => cmd,
                Err(e) => {
                    writeln!(out, "{e}")?;
                    continue;
                }
            };
            match cmd {
                Command::Exit => break,
                Command::Plot => self.plot(&mut out)?,
                Command::ChangeMode => self.change_mode(&mut input, &mut out)?,
                Command::Select(desired) => self.select(desired, &mut out)?,
            }
        }

        match self.latest {
            Some(r) => Ok(r),
            None => Ok(self.seq.extrema_at(self.mode, 1)?),
        }
    }

    fn select<W: Write>(&mut self, desired: usize, out: &mut W) -> anyhow::Result<()> {
        match self.seq.select(desired, self.mode) {
            Ok(r) => {
                writeln!(
                    out,
                    "Order {}: {} slices {r}",
                    r.order(),
                    r.total()
                )?;
                if !r.target_met() {
                    writeln!(out, "Fewer than {desired} slices at every order")?;
                }
                self.latest = Some(r);
            }
            Err(SelectError::InsufficientData(best)) => {
                writeln!(
                    out,
                    "Only {} slices exist at order 1, provide more data or change mode: {best}",
                    best.total()
                )?;
                self.latest = Some(best);
            }
            Err(e) => writeln!(out, "{e}")?,
        }
        Ok(())
    }

    fn change_mode<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> anyhow::Result<()> {
        let prompt = format!("Mode (max, min or both) [{}]: ", self.mode);
        let Some(line) = prompt_line(input, out, &prompt)? else {
            return Ok(());
        };
        if line.is_empty() {
            return Ok(());
        }
        match line.parse::<Mode>() {
            Ok(mode) if mode != self.mode => {
                info!("mode changed from {} to {mode}", self.mode);
                self.mode = mode;
                // 旧结果属于旧模式.
                self.latest = None;
            }
            Ok(_) => {}
            Err(e) => writeln!(out, "{e}")?,
        }
        Ok(())
    }

    fn plot<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        let chart = ScoreChart::render(self.seq);
        chart
            .save(&self.chart_path)
            .with_context(|| format!("cannot save chart to `{}`", self.chart_path.display()))?;
        writeln!(out, "Chart saved to `{}`", self.chart_path.display())?;

        if self.show {
            #[cfg(feature = "plot")]
            chart.show_and_wait()?;

            #[cfg(not(feature = "plot"))]
            log::warn!("built without the `plot` feature, the chart cannot be shown in a window");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn scenario() -> ScoreSequence {
        ScoreSequence::new(vec![1.0, 5.0, 2.0, 8.0, 3.0, 9.0, 1.0], 1)
    }

    fn run(seq: &ScoreSequence, input: &str) -> (ExtremaResult, String) {
        let mut out = Vec::new();
        let session = Session::new(seq, Mode::Both, PathBuf::from("unused.png"), false);
        let r = session.run(Cursor::new(input), &mut out).unwrap();
        (r, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_command() {
        assert_eq!("p".parse::<Command>(), Ok(Command::Plot));
        assert_eq!(" 0 ".parse::<Command>(), Ok(Command::ChangeMode));
        assert_eq!("-1".parse::<Command>(), Ok(Command::Exit));
        assert_eq!("12".parse::<Command>(), Ok(Command::Select(12)));
        assert!("-3".parse::<Command>().is_err());
        assert!("ten".parse::<Command>().is_err());
    }

    #[test]
    fn test_select_then_exit() {
        let seq = scenario();
        let (r, out) = run(&seq, "3\n-1\n");
        assert_eq!(r.order(), 1);
        assert_eq!(r.slices(), vec![2, 3, 4, 5, 6]);
        assert!(out.contains("Order 1: 5 slices"));
    }

    #[test]
    fn test_change_mode() {
        let seq = scenario();
        let (r, _) = run(&seq, "3\n0\nmax\n1\n-1\n");
        assert_eq!(r.mode(), Mode::Max);
        assert_eq!(r.order(), 3);
        assert_eq!(r.maxima(), Some([6].as_slice()));
    }

    #[test]
    fn test_exit_without_selection() {
        let seq = scenario();
        let (r, _) = run(&seq, "-1\n");
        assert_eq!(r.order(), 1);
        assert_eq!(r.total(), 5);
        assert!(!r.target_met());

        // 输入结束等同于退出.
        let (r, out) = run(&seq, "ten\n7\n");
        assert_eq!(r.order(), 1);
        assert!(out.contains("`ten` is not a valid input"));
        assert!(out.contains("not large enough"));
    }

    #[test]
    fn test_insufficient_keeps_best_effort() {
        let seq = ScoreSequence::new(vec![0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0], 1);
        let (r, out) = run(&seq, "5\n");
        assert_eq!(r.maxima(), Some([4].as_slice()));
        assert!(out.contains("Only 1 slices exist"));

        // 阶数为 1 时恰好 5 个, 同样没有余量.
        let seq = scenario();
        let (r, out) = run(&seq, "5\n");
        assert_eq!(r.slices(), vec![2, 3, 4, 5, 6]);
        assert!(!r.target_met());
        assert!(out.contains("Only 5 slices exist"));
    }

    #[test]
    fn test_plot_saves_chart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let seq = scenario();
        let session = Session::new(&seq, Mode::Both, path.clone(), false);
        let mut out = Vec::new();
        session.run(Cursor::new("p\n-1\n"), &mut out).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_prompt_index_offset() {
        let mut out = Vec::new();
        let mut input = Cursor::new("x\n1\n");
        assert_eq!(prompt_index_offset(&mut input, &mut out, 0).unwrap(), 1);

        let mut input = Cursor::new("\n");
        assert_eq!(prompt_index_offset(&mut input, &mut out, 0).unwrap(), 0);
    }
}
