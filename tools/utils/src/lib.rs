//! 命令行工具依赖的通用组件.

use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 初始化日志. 默认级别为 `warn`, `verbose` 为 1 时为 `info`, 更大时为 `debug`.
///
/// `$RUST_LOG` 非空时以它为准.
pub fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // 重复初始化时保留已有的 logger.
    let _ = SimpleLogger::new().with_level(level).env().init();
}

/// 以 `msg` 为标题、`len` 为总数的进度条.
pub fn progress_bar(len: usize, msg: &'static str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {msg:>8} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#> ");
    ProgressBar::new(len as u64).with_style(style).with_message(msg)
}

/// 字节数换算为 GiB.
#[inline]
pub fn to_gib(bytes: u64) -> f64 {
    bytes as f64 / slice_berry::consts::GIB as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        sep_to(&mut buf).unwrap();
        assert_eq!(buf, format!("{SEP}\n").into_bytes());
    }

    #[test]
    fn test_to_gib() {
        assert_eq!(to_gib(3 << 29), 1.5);
        assert!(cpus() >= 1);
    }

    #[test]
    fn test_progress_bar_length() {
        let pb = progress_bar(7, "summing");
        assert_eq!(pb.position(), 0);
        pb.finish_and_clear();
    }
}
