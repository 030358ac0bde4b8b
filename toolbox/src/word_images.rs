//! `word-images` - export every image embedded in a `.docx`.
//!
//! A `.docx` is a zip archive; embedded pictures live under `word/media/`.

use shared_utils::{ensure_dir_exists, AppError, Result};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

pub const MEDIA_PREFIX: &str = "word/media/";
const ZIP_MAGIC: &[u8; 2] = b"PK";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub exported: Vec<PathBuf>,
}

/// Cheap zip sniff: every zip (and so every `.docx`) starts with `PK`.
pub fn looks_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Output file name for a media entry, or `None` when it has no base name.
pub fn media_file_name(entry_name: &str) -> Option<&str> {
    entry_name
        .strip_prefix(MEDIA_PREFIX)?
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Entry point for the command.
pub fn extract_word_images(input: &Path, output_dir: &Path) -> Result<ExtractReport> {
    let meta = std::fs::metadata(input).map_err(|_| AppError::InputNotFound {
        path: input.to_path_buf(),
    })?;
    if !meta.is_file() {
        return Err(AppError::NotAFile {
            path: input.to_path_buf(),
        });
    }

    let bytes = std::fs::read(input).map_err(|e| AppError::io(input, e))?;
    if !looks_like_zip(&bytes) {
        return Err(AppError::NotADocx {
            path: input.to_path_buf(),
        });
    }

    println!("📄 Reading Word document: {}", input.display());
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let media: Vec<usize> = (0..archive.len())
        .filter(|&i| {
            archive
                .name_for_index(i)
                .and_then(media_file_name)
                .is_some()
        })
        .collect();

    if media.is_empty() {
        println!("No images found under {}.", MEDIA_PREFIX);
        return Ok(ExtractReport::default());
    }

    ensure_dir_exists(output_dir)?;

    let mut report = ExtractReport::default();
    for index in media {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = media_file_name(entry.name()).map(str::to_owned) else {
            continue;
        };

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| AppError::io(input, e))?;

        let out_path = output_dir.join(&name);
        std::fs::write(&out_path, &content).map_err(|e| AppError::io(&out_path, e))?;
        debug!(entry = entry.name(), bytes = content.len(), "Exported media entry");
        println!("Exported: {}", name);
        report.exported.push(out_path);
    }

    info!(
        input = %input.display(),
        output_dir = %output_dir.display(),
        count = report.exported.len(),
        "Word images exported"
    );
    println!(
        "✅ Exported {} images -> {}",
        report.exported.len(),
        output_dir.display()
    );
    Ok(report)
}
