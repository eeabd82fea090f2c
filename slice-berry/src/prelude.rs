//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d, SliceNum};

pub use crate::{LabelVolume, LoadError, ScoreChart, SliceStack};
pub use crate::{Metric, ParseMetricError, ScoreSequence, ScoreSequenceBuilder, ScoreStage};

#[cfg(feature = "plot")]
pub use crate::ImgDisplay;

pub use crate::extrema::{select, ExtremaKind, ExtremaResult, Mode, SelectError, SelectionRequest};

#[cfg(feature = "rayon")]
pub use crate::extrema::par_select;

pub use crate::stats::{evaluate, ConfusionMatrix, ConfusionStats, StatsError};

pub use crate::consts::{IMAGE_EXTENSIONS, POSITIVE_LABEL_8BIT};

pub use crate::dataset::{self, collect_image_paths, home_dataset_dir_with, CollectError};
