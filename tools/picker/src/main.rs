//! 训练切片选取工具.
//!
//! 计算图像栈 (或 nifti 体数据) 的逐切片差异度, 并按差异度曲线的局部极值选取切片.
//! 给定 `--desired` 时只选取一次, 否则进入交互模式.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use log::info;
use slice_berry::dataset::{self, collect_image_paths};
use slice_berry::extrema::{ExtremaResult, Mode, SelectError};
use slice_berry::{Metric, ScoreChart, ScoreSequence, ScoreSequenceBuilder, ScoreStage, SliceStack};
use utils::loader;

mod result;
mod runner;

/// 默认的交互式曲线输出路径.
const DEFAULT_CHART: &str = "scores.png";

#[derive(Parser, Debug)]
#[command(name = "picker", version, about = "Select representative training slices from an image stack")]
struct Cli {
    /// Image folder or NIfTI volume. Defaults to `$SLICE_DATASET_DIR`, then `$HOME/dataset/slices`
    path: Option<PathBuf>,

    /// Number of slices to select. Starts an interactive session when omitted
    #[arg(short, long)]
    desired: Option<usize>,

    /// Extrema kinds that count towards the selection: max, min or both
    #[arg(short, long, default_value_t = Mode::Both)]
    mode: Mode,

    /// Slice number of the first slice. Asked for interactively when omitted
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<i64>,

    /// Difference metric: mae or mse
    #[arg(long, default_value_t = Metric::MeanSquared)]
    metric: Metric,

    /// Load the whole stack into memory and score slices in parallel
    #[arg(long)]
    in_memory: bool,

    /// Save the (slice number, score) table as `.npy`
    #[arg(long)]
    table: Option<PathBuf>,

    /// Save the score chart as an image
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Show the chart in a window when plotting (needs the `plot` feature)
    #[arg(long)]
    show: bool,

    /// Save the selected slice numbers, one per line
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn is_nifti(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|n| n.ends_with(".nii") || n.ends_with(".nii.gz"))
}

/// 计算差异度序列. 编号起点暂定为 0.
fn score(path: &Path, builder: ScoreSequenceBuilder, in_memory: bool) -> anyhow::Result<ScoreSequence> {
    if is_nifti(path) {
        let stack = SliceStack::open_nifti(path)
            .with_context(|| format!("cannot load volume `{}`", path.display()))?;
        println!("Volume shape: {:?}", stack.shape());
        return Ok(builder.par_from_stack(&stack));
    }

    let paths = collect_image_paths(path)?;
    let size = dataset::total_size(&paths);
    println!(
        "Found {} slices, {:.3} GiB in total",
        paths.len(),
        utils::to_gib(size)
    );

    if in_memory {
        let stack = SliceStack::open_images(&paths).context("cannot load image stack")?;
        info!("scoring {} slices on {} threads", stack.len_z(), utils::cpus());
        return Ok(builder.par_from_stack(&stack));
    }

    let summing = utils::progress_bar(paths.len(), "summing");
    let scoring = utils::progress_bar(paths.len(), "scoring");
    let seq = builder
        .from_paths_with(&paths, |stage, done| match stage {
            ScoreStage::Summing => summing.set_position(done as u64),
            ScoreStage::Scoring => {
                if done == 1 {
                    summing.finish();
                }
                scoring.set_position(done as u64);
            }
        })
        .context("cannot compute scores")?;
    summing.finish();
    scoring.finish();
    Ok(seq)
}

/// 只选取一次. 数据不足时退回阶数为 1 的结果.
fn select_once(seq: &ScoreSequence, desired: usize, mode: Mode) -> anyhow::Result<ExtremaResult> {
    match seq.select(desired, mode) {
        Ok(r) => Ok(r),
        Err(SelectError::InsufficientData(best)) => {
            println!(
                "Warning: only {} slices exist at order 1, provide more data or change mode",
                best.total()
            );
            Ok(best)
        }
        Err(e) => bail!(e),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init_logger(cli.verbose);

    let Some(path) = loader::dataset_dir(cli.path.clone()) else {
        bail!("no dataset path given and the home directory is unknown");
    };
    println!("Dataset: {}", path.display());

    let builder = ScoreSequenceBuilder::new(cli.metric);
    let seq = score(&path, builder, cli.in_memory)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let offset = match (cli.offset, cli.desired) {
        (Some(offset), _) => offset,
        (None, Some(_)) => 0,
        (None, None) => runner::prompt_index_offset(&mut input, &mut out, 0)?,
    };
    let seq = seq.with_index_offset(offset);

    utils::sep();
    result::describe_scores_into(&seq, &mut out)?;
    writeln!(out)?;
    utils::sep();

    if let Some(table) = &cli.table {
        seq.save_table(table)
            .with_context(|| format!("cannot save table to `{}`", table.display()))?;
        println!("Table saved to `{}`", table.display());
    }
    if let Some(chart) = &cli.chart {
        ScoreChart::render(&seq)
            .save(chart)
            .with_context(|| format!("cannot save chart to `{}`", chart.display()))?;
        println!("Chart saved to `{}`", chart.display());
    }

    let r = match cli.desired {
        Some(desired) => select_once(&seq, desired, cli.mode)?,
        None => {
            let chart = cli.chart.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CHART));
            let session = runner::Session::new(&seq, cli.mode, chart, cli.show);
            info!("interactive session started in `{}` mode", session.mode());
            session.run(&mut input, &mut out)?
        }
    };

    utils::sep();
    result::describe_into(&r, &mut out)?;
    writeln!(out)?;
    utils::sep();

    if let Some(output) = &cli.output {
        fs::write(output, result::selection_lines(&r))
            .with_context(|| format!("cannot save selection to `{}`", output.display()))?;
        println!("Selection saved to `{}`", output.display());
    }
    Ok(())
}
