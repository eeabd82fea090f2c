//! 分割结果评估工具.
//!
//! 将真值 / 预测 (以及可选的 ROI 掩膜) 图像文件夹分别堆叠为标签体数据,
//! 计算混淆矩阵并打印精确率, 召回率, F1 和像素误差.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::info;
use slice_berry::consts::POSITIVE_LABEL_8BIT;
use slice_berry::dataset::list_images;
use slice_berry::stats::{self, ConfusionStats};
use slice_berry::LabelVolume;

#[derive(Parser, Debug)]
#[command(name = "confusion", version, about = "Confusion-matrix statistics between two label stacks")]
struct Cli {
    /// Ground truth image folder
    ground_truth: PathBuf,

    /// Predicted image folder
    predicted: PathBuf,

    /// ROI mask image folder. Only voxels equal to the positive label are counted
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Foreground value, `2^bits - 1` for binary label images. Must differ from the background 0
    #[arg(long, default_value_t = POSITIVE_LABEL_8BIT, value_parser = clap::value_parser!(u16).range(1..))]
    pos_label: u16,

    /// Print bare numbers, one per line
    #[arg(long)]
    terse: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn load(dir: &Path, what: &str) -> anyhow::Result<LabelVolume> {
    let paths = list_images(dir).with_context(|| format!("cannot list {what} folder"))?;
    let volume = LabelVolume::open_images(&paths)
        .with_context(|| format!("cannot load {what} folder `{}`", dir.display()))?;
    info!("{what}: {} slices, shape {:?}", paths.len(), volume.shape());
    Ok(volume)
}

/// 加载三个文件夹并计算统计量.
fn evaluate(cli: &Cli) -> anyhow::Result<ConfusionStats> {
    let ground_truth = load(&cli.ground_truth, "ground truth")?;
    let predicted = load(&cli.predicted, "predicted")?;
    let mask = cli
        .mask
        .as_deref()
        .map(|dir| load(dir, "ROI mask"))
        .transpose()?;
    let ans = stats::evaluate(&ground_truth, &predicted, cli.pos_label, mask.as_ref())?;
    Ok(ans)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init_logger(cli.verbose);

    if !cli.terse {
        println!("Ground truth folder: {}", cli.ground_truth.display());
        println!("Predicted folder: {}", cli.predicted.display());
        match &cli.mask {
            Some(mask) => println!("ROI mask folder: {}", mask.display()),
            None => println!("No ROI mask selected, calculations will include the entire dataset."),
        }
        utils::sep();
    }

    let stats = evaluate(&cli)?;
    stats.describe_into(&mut io::stdout(), !cli.terse)?;
    if !cli.terse {
        utils::sep();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    /// 在 `dir` 下写入 `n` 张 2x2 切片, 第 `z` 张的 `(0, 0)` 像素取 `first(z)`.
    fn write_stack(dir: &Path, n: usize, first: impl Fn(usize) -> u8) {
        std::fs::create_dir_all(dir).unwrap();
        for z in 0..n {
            let mut img = GrayImage::new(2, 2);
            img.put_pixel(0, 0, Luma([first(z)]));
            img.save(dir.join(format!("{z:03}.png"))).unwrap();
        }
    }

    fn cli(root: &Path, mask: bool) -> Cli {
        Cli {
            ground_truth: root.join("gt"),
            predicted: root.join("pred"),
            mask: mask.then(|| root.join("mask")),
            pos_label: POSITIVE_LABEL_8BIT,
            terse: false,
            verbose: 0,
        }
    }

    #[test]
    fn test_evaluate_folders() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_stack(&root.join("gt"), 3, |z| if z == 1 { 255 } else { 0 });
        write_stack(&root.join("pred"), 3, |z| if z >= 1 { 255 } else { 0 });

        let s = evaluate(&cli(root, false)).unwrap();
        let cm = s.matrix();
        assert_eq!((cm.tp, cm.fp, cm.fn_, cm.tn), (1, 1, 0, 10));
        assert_eq!(s.precision(), Some(0.5));
        assert_eq!(s.recall(), Some(1.0));
        assert_eq!(s.roi_voxels(), None);

        write_stack(&root.join("mask"), 3, |z| if z == 2 { 255 } else { 0 });
        let s = evaluate(&cli(root, true)).unwrap();
        assert_eq!(s.roi_voxels(), Some(1));
        assert_eq!(s.matrix().fp, 1);
        assert_eq!(s.matrix().total(), 1);
    }

    #[test]
    fn test_pos_label_must_be_foreground() {
        let parse = |label: &str| Cli::try_parse_from(["confusion", "gt", "pred", "--pos-label", label]);
        assert!(parse("0").is_err());
        assert!(parse("-1").is_err());
        assert_eq!(parse("1").unwrap().pos_label, 1);
        assert_eq!(parse("65535").unwrap().pos_label, u16::MAX);

        let cli = Cli::try_parse_from(["confusion", "gt", "pred"]).unwrap();
        assert_eq!(cli.pos_label, POSITIVE_LABEL_8BIT);
    }

    #[test]
    fn test_mismatched_folders() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_stack(&root.join("gt"), 3, |_| 0);
        write_stack(&root.join("pred"), 2, |_| 0);

        let err = evaluate(&cli(root, false)).unwrap_err();
        assert!(err.downcast_ref::<stats::StatsError>().is_some());
    }
}
