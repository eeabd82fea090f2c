//! 数据集文件夹操作: 收集切片文件, 统计大小, 按关键字查找子目录.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::consts::IMAGE_EXTENSIONS;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 收集文件路径时的错误.
#[derive(Debug)]
pub enum CollectError {
    /// 路径既不是文件也不是目录.
    NotFound(PathBuf),

    /// 单个文件的扩展名不在接受列表中.
    NotAccepted(PathBuf),

    /// 目录中没有任何匹配的文件.
    NoMatchingFiles(PathBuf),

    /// 读取目录失败.
    Io(PathBuf, io::Error),
}

/// 收集文件路径运行时错误.
pub type CollectResult<T> = Result<T, CollectError>;

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(p) => write!(f, "`{}` is neither a file nor a directory", p.display()),
            Self::NotAccepted(p) => write!(f, "`{}` does not have an accepted extension", p.display()),
            Self::NoMatchingFiles(p) => {
                write!(f, "no files with accepted extensions under `{}`", p.display())
            }
            Self::Io(p, e) => write!(f, "cannot read `{}`: {e}", p.display()),
        }
    }
}

impl Error for CollectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// 文件名是否以 `accepted` 中任一后缀结尾 (区分大小写).
#[inline]
pub fn has_accepted_extension<S: AsRef<str>>(path: &Path, accepted: &[S]) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| accepted.iter().any(|ext| name.ends_with(ext.as_ref())))
}

/// 收集 `path` 下所有扩展名被接受的文件.
///
/// 1. `path` 是文件时, 扩展名被接受则返回 `[path]`, 否则返回 [`CollectError::NotAccepted`];
/// 2. `path` 是目录时, 递归收集. 每个目录中先按名称顺序列出文件, 再按名称顺序进入子目录.
///   没有任何匹配时返回 [`CollectError::NoMatchingFiles`];
/// 3. 其余情况返回 [`CollectError::NotFound`].
///
/// 后缀按原样比较, 例如 `".png"` 不匹配 `A.PNG`.
pub fn collect_file_paths<P, S>(path: P, accepted: &[S]) -> CollectResult<Vec<PathBuf>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    if path.is_file() {
        return if has_accepted_extension(path, accepted) {
            Ok(vec![path.to_owned()])
        } else {
            Err(CollectError::NotAccepted(path.to_owned()))
        };
    }
    if !path.is_dir() {
        return Err(CollectError::NotFound(path.to_owned()));
    }

    let mut ans = Vec::new();
    collect_into(path, accepted, &mut ans)?;
    if ans.is_empty() {
        return Err(CollectError::NoMatchingFiles(path.to_owned()));
    }
    Ok(ans)
}

/// 同 `collect_file_paths`, 使用 [`IMAGE_EXTENSIONS`].
#[inline]
pub fn collect_image_paths<P: AsRef<Path>>(path: P) -> CollectResult<Vec<PathBuf>> {
    collect_file_paths(path, &IMAGE_EXTENSIONS)
}

fn collect_into<S: AsRef<str>>(dir: &Path, accepted: &[S], out: &mut Vec<PathBuf>) -> CollectResult<()> {
    let (files, subdirs) = sorted_entries(dir)?;
    out.extend(
        files
            .into_iter()
            .filter(|p| has_accepted_extension(p, accepted)),
    );
    for sub in subdirs {
        collect_into(&sub, accepted, out)?;
    }
    Ok(())
}

/// 按名称排序的 (文件, 子目录).
fn sorted_entries(dir: &Path) -> CollectResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    let io_err = |e| CollectError::Io(dir.to_owned(), e);
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}

/// 所有文件大小之和 (字节). 不是文件的路径会被跳过, 并以 `warn` 级别记录.
pub fn total_size<P: AsRef<Path>>(paths: &[P]) -> u64 {
    paths
        .iter()
        .filter_map(|p| {
            let p: &Path = p.as_ref();
            match fs::metadata(p) {
                Ok(meta) if meta.is_file() => Some(meta.len()),
                _ => {
                    warn!("`{}` is not a valid file, skipped", p.display());
                    None
                }
            }
        })
        .sum()
}

/// 在 `directory` 下查找第一个名称包含 `key_phrase` 的子目录.
///
/// 自顶向下遍历: 先按名称顺序检查一个目录的所有直接子目录, 再依次进入它们.
/// `key_phrase` 为空, 或没有匹配时返回 `None`. 无法读取的目录会被跳过.
pub fn search_folders<P: AsRef<Path>>(directory: P, key_phrase: &str) -> Option<PathBuf> {
    if key_phrase.is_empty() {
        return None;
    }
    search_imp(directory.as_ref(), key_phrase)
}

fn search_imp(dir: &Path, key_phrase: &str) -> Option<PathBuf> {
    let (_, subdirs) = sorted_entries(dir).ok()?;
    let hit = subdirs.iter().find(|p| {
        p.file_name()
            .is_some_and(|name| name.to_string_lossy().contains(key_phrase))
    });
    if let Some(hit) = hit {
        return Some(hit.clone());
    }
    subdirs.iter().find_map(|p| search_imp(p, key_phrase))
}

/// 按名称顺序列出 `dir` 中 (不递归) 的所有图像文件.
pub fn list_images<P: AsRef<Path>>(dir: P) -> CollectResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CollectError::NotFound(dir.to_owned()));
    }
    let (files, _) = sorted_entries(dir)?;
    let ans: Vec<_> = files
        .into_iter()
        .filter(|p| has_accepted_extension(p, &IMAGE_EXTENSIONS))
        .collect();
    if ans.is_empty() {
        return Err(CollectError::NoMatchingFiles(dir.to_owned()));
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    /// 三层嵌套, 每层两个 `.txt` 和一个 `ignore.md`.
    fn nested_tree(root: &Path) -> (PathBuf, PathBuf) {
        touch(&root.join("file1.txt"), "test1");
        touch(&root.join("file2.txt"), "test2");
        touch(&root.join("ignore.md"), "nope");

        let nested = root.join("nested");
        fs::create_dir(&nested).unwrap();
        touch(&nested.join("nested1.txt"), "nested_file1");
        touch(&nested.join("nested2.txt"), "nested_file2");
        touch(&nested.join("ignore.md"), "not a txt");

        let double = nested.join("double_nested");
        fs::create_dir(&double).unwrap();
        touch(&double.join("double_nested1.txt"), "double_nested_file1");
        touch(&double.join("double_nested2.txt"), "double_nested_file2");
        touch(&double.join("ignore.md"), "not a txt");
        (nested, double)
    }

    #[test]
    fn test_collect_file_paths_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let (nested, double) = nested_tree(root);

        let txt = collect_file_paths(root, &[".txt"]).unwrap();
        assert_eq!(
            txt,
            vec![
                root.join("file1.txt"),
                root.join("file2.txt"),
                nested.join("nested1.txt"),
                nested.join("nested2.txt"),
                double.join("double_nested1.txt"),
                double.join("double_nested2.txt"),
            ]
        );

        let all = collect_file_paths(root, &[".txt", ".md"]).unwrap();
        assert_eq!(
            all,
            vec![
                root.join("file1.txt"),
                root.join("file2.txt"),
                root.join("ignore.md"),
                nested.join("ignore.md"),
                nested.join("nested1.txt"),
                nested.join("nested2.txt"),
                double.join("double_nested1.txt"),
                double.join("double_nested2.txt"),
                double.join("ignore.md"),
            ]
        );
    }

    #[test]
    fn test_collect_file_paths_errors() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        nested_tree(root);

        assert!(matches!(
            collect_file_paths(root, &[".wav"]),
            Err(CollectError::NoMatchingFiles(_))
        ));

        let single = root.join("file1.txt");
        assert_eq!(collect_file_paths(&single, &[".txt"]).unwrap(), vec![single]);

        let wav = root.join("file1.wav");
        touch(&wav, "dummy");
        assert!(matches!(
            collect_file_paths(&wav, &[".txt"]),
            Err(CollectError::NotAccepted(_))
        ));

        assert!(matches!(
            collect_file_paths(root.join("missing"), &[".txt"]),
            Err(CollectError::NotFound(_))
        ));
    }

    #[test]
    fn test_extension_is_case_sensitive() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("A.PNG"), "");
        assert!(!has_accepted_extension(&dir.path().join("A.PNG"), &IMAGE_EXTENSIONS));
        assert!(has_accepted_extension(Path::new("x/slice_001.tif"), &IMAGE_EXTENSIONS));
        assert!(matches!(
            collect_image_paths(dir.path()),
            Err(CollectError::NoMatchingFiles(_))
        ));
    }

    #[test]
    fn test_total_size() {
        let dir = tempdir().unwrap();
        let file1 = dir.path().join("file1.txt");
        let file2 = dir.path().join("file2.txt");
        touch(&file1, "abcd");
        touch(&file2, "12345678");
        let missing = dir.path().join("does_not_exist.txt");

        assert_eq!(total_size(&[&file1, &file2]), 12);
        assert_eq!(total_size(&[&file1, &missing]), 4);
        assert_eq!(total_size(&[dir.path()]), 0);
        let none: [&Path; 0] = [];
        assert_eq!(total_size(&none), 0);
    }

    #[test]
    fn test_search_folders() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let (nested, double) = nested_tree(root);
        fs::create_dir(root.join("zz_double")).unwrap();

        // 浅层目录优先于深层目录.
        assert_eq!(search_folders(root, "double"), Some(root.join("zz_double")));
        assert_eq!(search_folders(root, "double_nes"), Some(double));
        assert_eq!(search_folders(root, "nest"), Some(nested));
        assert_eq!(search_folders(root, "file1"), None);
        assert_eq!(search_folders(root, ""), None);
        assert_eq!(search_folders(root.join("missing"), "nested"), None);
    }

    #[test]
    fn test_list_images() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.png"), "");
        touch(&root.join("a.tif"), "");
        touch(&root.join("notes.txt"), "");
        fs::create_dir(root.join("sub")).unwrap();
        touch(&root.join("sub").join("c.png"), "");

        assert_eq!(
            list_images(root).unwrap(),
            vec![root.join("a.tif"), root.join("b.png")]
        );
        assert!(matches!(
            list_images(root.join("sub").join("c.png")),
            Err(CollectError::NotFound(_))
        ));
    }

    #[test]
    fn test_home_dataset_dir_with() {
        if let Some(home) = home_dataset_dir() {
            assert_eq!(home_dataset_dir_with(["slices"]), Some(home.join("slices")));
        }
    }
}
