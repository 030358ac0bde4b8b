//! Common Utilities Module
//!
//! 文件与路径相关的小工具：扩展名判断、目录创建、相对路径解析。

use crate::app_error::{AppError, Result};
use std::path::{Path, PathBuf};

// ═══════════════════════════════════════════════════════════════
// 文件操作工具 (File Operations)
// ═══════════════════════════════════════════════════════════════

/// 安全地获取文件扩展名（小写），没有扩展名时返回空字符串
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// 检查文件扩展名是否在给定列表中（不区分大小写，列表不带点号）
///
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// assert!(has_extension(Path::new("photo.JPG"), &["jpg", "png"]));
/// assert!(!has_extension(Path::new("video.mp4"), &["jpg", "png"]));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    !ext.is_empty() && extensions.contains(&ext.as_str())
}

/// 创建目录（包括父目录），已存在时不报错
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))
}

/// 创建文件的父目录
pub fn ensure_parent_dir_exists(file_path: &Path) -> Result<()> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent),
        _ => Ok(()),
    }
}

/// Resolves a user-supplied path against the current working directory.
pub fn resolve_from_cwd(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| resolve_against(&cwd, path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Resolves `path` against `base`; absolute paths are kept as they are.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// File size in bytes, with the path in the error.
pub fn file_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| AppError::io(path, e))
}

/// File name without extension, lossy.
pub fn file_stem_lossy(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Original extension with its case preserved, including the leading dot (`".JPG"`).
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// 检查文件是否为隐藏文件（以点号开头）
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_extension_case_insensitive() {
        let exts = &["jpg", "jpeg", "png"];
        assert!(has_extension(Path::new("a/B.JPEG"), exts));
        assert!(!has_extension(Path::new("a/jpg"), exts));
        assert!(!has_extension(Path::new("a/b.gif"), exts));
    }

    #[test]
    fn test_ensure_parent_dir_exists() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x/y/z.png");
        ensure_parent_dir_exists(&file).unwrap();
        assert!(dir.path().join("x/y").is_dir());

        // bare file name: nothing to create
        ensure_parent_dir_exists(Path::new("plain.png")).unwrap();
    }

    #[test]
    fn test_resolve_against() {
        let base = Path::new("/work");
        assert_eq!(
            resolve_against(base, Path::new("out/a.png")),
            PathBuf::from("/work/out/a.png")
        );
        assert_eq!(
            resolve_against(base, Path::new("/abs/a.png")),
            PathBuf::from("/abs/a.png")
        );
    }

    #[test]
    fn test_resolve_from_cwd_is_absolute() {
        assert!(resolve_from_cwd(Path::new("rel.png")).is_absolute());
    }

    #[test]
    fn test_stem_and_extension() {
        let p = Path::new("/pics/Holiday.Shot.JPG");
        assert_eq!(file_stem_lossy(p), "Holiday.Shot");
        assert_eq!(dotted_extension(p), ".JPG");
        assert_eq!(dotted_extension(Path::new("/pics/noext")), "");
    }

    #[test]
    fn test_file_size_missing() {
        let err = file_size(Path::new("/no/such/file.bin")).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden_file(Path::new("/a/.DS_Store")));
        assert!(!is_hidden_file(Path::new("/a/photo.png")));
    }
}
