//! 对 `slice-berry::dataset` 的更一层封装. 提供更直接的数据集路径.

use std::env;
use std::path::PathBuf;

/// 数据集路径环境变量.
pub const DATASET_DIR_ENV: &str = "SLICE_DATASET_DIR";

/// 获取切片数据集基本路径.
///
/// 1. 若 `explicit` 非空, 则返回它;
/// 2. 否则若环境变量 `$SLICE_DATASET_DIR` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/dataset/slices`. 无法确定用户主目录时返回 `None`.
pub fn dataset_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(dataset_dir_from_env_or_home)
}

/// 同 `dataset_dir`, 但不接收命令行参数.
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATASET_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => slice_berry::dataset::home_dataset_dir_with(["slices"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let p = PathBuf::from("/data/scan_01");
        assert_eq!(dataset_dir(Some(p.clone())), Some(p));
    }
}
