//! 派生统计量与文字报告.

use std::io::{self, Write};

use super::ConfusionMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 混淆矩阵及其派生统计量. 分母为 0 的统计量为 `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfusionStats {
    tp: u64,
    fp: u64,
    fn_: u64,
    tn: u64,
    ignored: u64,
    roi_voxels: Option<u64>,
    precision: Option<f64>,
    recall: Option<f64>,
    f1: Option<f64>,
    pixel_error: Option<f64>,
}

#[inline]
fn ratio(num: u64, den: u64) -> Option<f64> {
    (den != 0).then(|| num as f64 / den as f64)
}

impl ConfusionStats {
    /// 由混淆矩阵和 ROI 体素数计算.
    pub fn new(cm: ConfusionMatrix, roi_voxels: Option<u64>) -> Self {
        let ConfusionMatrix {
            tp,
            fp,
            fn_,
            tn,
            ignored,
        } = cm;
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = match (precision, recall) {
            (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
            _ => None,
        };
        Self {
            tp,
            fp,
            fn_,
            tn,
            ignored,
            roi_voxels,
            precision,
            recall,
            f1,
            pixel_error: ratio(fp + fn_, cm.total()),
        }
    }

    /// 原始混淆矩阵.
    #[inline]
    pub fn matrix(&self) -> ConfusionMatrix {
        ConfusionMatrix {
            tp: self.tp,
            fp: self.fp,
            fn_: self.fn_,
            tn: self.tn,
            ignored: self.ignored,
        }
    }

    /// ROI 体素数. 没有掩膜时为 `None`.
    #[inline]
    pub fn roi_voxels(&self) -> Option<u64> {
        self.roi_voxels
    }

    /// TP / (TP + FP).
    #[inline]
    pub fn precision(&self) -> Option<f64> {
        self.precision
    }

    /// TP / (TP + FN).
    #[inline]
    pub fn recall(&self) -> Option<f64> {
        self.recall
    }

    /// 2PR / (P + R).
    #[inline]
    pub fn f1(&self) -> Option<f64> {
        self.f1
    }

    /// (FP + FN) / 总数.
    #[inline]
    pub fn pixel_error(&self) -> Option<f64> {
        self.pixel_error
    }

    /// `[tp, fn, fp, tn, precision, recall, f1, pixel_error]`, 缺失的统计量为 NaN.
    pub fn to_row(&self) -> [f64; 8] {
        let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);
        [
            self.tp as f64,
            self.fn_ as f64,
            self.fp as f64,
            self.tn as f64,
            nan(self.precision),
            nan(self.recall),
            nan(self.f1),
            nan(self.pixel_error),
        ]
    }

    /// 将报告写进 `w` 中. `labeled` 为 `false` 时每行只有一个数字.
    pub fn describe_into<W: Write>(&self, w: &mut W, labeled: bool) -> io::Result<()> {
        #[inline]
        fn f64_to_display(f: Option<f64>) -> String {
            match f {
                Some(f) => format!("{f:.6}"),
                None => "/".to_string(),
            }
        }

        let counts = [
            ("True positive (TP)", self.tp),
            ("False negative (FN)", self.fn_),
            ("False positive (FP)", self.fp),
            ("True negative (TN)", self.tn),
        ];
        let ratios = [
            ("Precision", self.precision),
            ("Recall", self.recall),
            ("F1-score", self.f1),
            ("Pixel Error", self.pixel_error),
        ];

        if !labeled {
            for (_, v) in counts {
                writeln!(w, "{v}")?;
            }
            for (_, v) in ratios {
                writeln!(w, "{}", f64_to_display(v))?;
            }
            return Ok(());
        }

        if let Some(roi) = self.roi_voxels {
            writeln!(w, "ROI voxels: {roi}")?;
        }
        if self.ignored > 0 {
            writeln!(w, "Ignored voxels: {}", self.ignored)?;
        }
        for (name, v) in counts {
            writeln!(w, "{name}: {v}")?;
        }
        writeln!(w)?;
        for (name, v) in ratios {
            writeln!(w, "{name}: {}", f64_to_display(v))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfusionStats {
        let cm = ConfusionMatrix {
            tp: 6,
            fp: 2,
            fn_: 4,
            tn: 88,
            ignored: 0,
        };
        ConfusionStats::new(cm, Some(100))
    }

    #[test]
    fn test_derived_values() {
        let s = sample();
        assert_eq!(s.precision(), Some(0.75));
        assert_eq!(s.recall(), Some(0.6));
        assert!((s.f1().unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.pixel_error(), Some(0.06));
        assert_eq!(s.roi_voxels(), Some(100));
        assert_eq!(s.matrix().total(), 100);
    }

    #[test]
    fn test_zero_denominators() {
        let s = ConfusionStats::new(ConfusionMatrix::default(), None);
        assert_eq!(s.precision(), None);
        assert_eq!(s.recall(), None);
        assert_eq!(s.f1(), None);
        assert_eq!(s.pixel_error(), None);
        assert!(s.to_row()[4].is_nan());
        assert_eq!(s.to_row()[..4], [0.0; 4]);
    }

    #[test]
    fn test_row_order() {
        let row = sample().to_row();
        assert_eq!(row[..4], [6.0, 4.0, 2.0, 88.0]);
        assert_eq!(row[4], 0.75);
    }

    #[test]
    fn test_describe_into() {
        let s = sample();
        let mut buf = Vec::new();
        s.describe_into(&mut buf, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("ROI voxels: 100\nTrue positive (TP): 6\n"));
        assert!(text.contains("False negative (FN): 4\n"));
        assert!(text.contains("Precision: 0.750000\n"));
        assert!(text.ends_with("Pixel Error: 0.060000\n"));

        let mut buf = Vec::new();
        ConfusionStats::new(ConfusionMatrix::default(), None)
            .describe_into(&mut buf, false)
            .unwrap();
        let lines: Vec<_> = std::str::from_utf8(&buf).unwrap().lines().collect();
        assert_eq!(lines, ["0", "0", "0", "0", "/", "/", "/", "/"]);
    }
}
