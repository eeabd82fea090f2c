//! 选取结果.

use slice_berry::extrema::ExtremaResult;
use slice_berry::ScoreSequence;
use std::io::{self, Write};

const S4: &str = "    ";

/// 将差异度序列概况写进 `w` 中.
pub fn describe_scores_into<W: Write>(seq: &ScoreSequence, w: &mut W) -> io::Result<()> {
    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Scores:")?;
    writeln!(w, "{S4}Slices: {}", seq.len())?;
    writeln!(w, "{S4}First slice number: {}", seq.index_offset())?;
    writeln!(w, "{S4}Mean: {}", f64_to_display(seq.mean()))?;
    write!(w, "{S4}Median: {}", f64_to_display(seq.median()))?;
    Ok(())
}

/// 将 `r` 按类别写进 `w` 中.
pub fn describe_into<W: Write>(r: &ExtremaResult, w: &mut W) -> io::Result<()> {
    let met = if r.target_met() { "met" } else { "not met" };
    writeln!(w, "Selected slices (mode `{}`, order {}, target {met}):", r.mode(), r.order())?;
    for (kind, slices) in r.iter() {
        let list = slices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(w, "{S4}{kind}: [{list}]")?;
    }
    write!(w, "{S4}Total: {}", r.total())?;
    Ok(())
}

/// 合并后的切片编号, 每行一个.
pub fn selection_lines(r: &ExtremaResult) -> String {
    r.slices().iter().map(|n| format!("{n}\n")).collect()
}
