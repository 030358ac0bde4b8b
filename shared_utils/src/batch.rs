//! Batch Processing Module
//!
//! Directory listing for the batch commands. Listings are non-recursive and
//! sorted by file name so runs are deterministic.

use crate::common_utils::{has_extension, is_hidden_file};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Inputs accepted by `compress`.
pub const COMPRESS_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "tif", "avif"];

/// Inputs accepted by `grid9`.
pub const GRID_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

/// Regular files directly inside `dir` whose extension is in `extensions`.
pub fn collect_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_hidden_file(e.path()))
        .filter(|e| has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.PNG", "a.jpg", "c.txt", ".hidden.jpg", "d.tif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/e.jpg"), b"x").unwrap();

        let files = collect_files(dir.path(), COMPRESS_EXTENSIONS);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "d.tif"]);
    }

    #[test]
    fn test_grid_extensions_exclude_tiff() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.tiff"), b"x").unwrap();
        fs::write(dir.path().join("b.bmp"), b"x").unwrap();
        let files = collect_files(dir.path(), GRID_EXTENSIONS);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("b.bmp"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        assert!(collect_files(Path::new("/no/such/dir"), GRID_EXTENSIONS).is_empty());
    }
}
