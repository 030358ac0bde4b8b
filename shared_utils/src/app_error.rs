//! AppError - 统一的应用错误类型
//!
//! 每个命令返回 `Result<T, AppError>`，`main` 负责打印 `user_message()` 并以
//! `exit_code()` 退出。

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("input path does not exist: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("input folder is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("input path is not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("{} is not a supported image format ({})", path.display(), supported.join("/"))]
    UnsupportedImage {
        path: PathBuf,
        supported: &'static [&'static str],
    },

    #[error("no supported images found in directory: {}", dir.display())]
    NoImagesFound { dir: PathBuf },

    #[error("not enough images (found {found}, need at least {required})")]
    NotEnoughImages { found: usize, required: usize },

    #[error("{} does not look like a .docx (zip) file; convert .doc to .docx first", path.display())]
    NotADocx { path: PathBuf },

    #[error("{tool} not found: {hint}")]
    ToolNotFound { tool: String, hint: String },

    #[error("ffmpeg failed (exit code {exit_code:?}): {message}")]
    FfmpegFailed {
        message: String,
        exit_code: Option<i32>,
        command: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code: 2 for a malformed document, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotADocx { .. } => 2,
            _ => 1,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::ToolNotFound { tool, .. } => format!(
                "❌ {}\n💡 Install {} or point FFMPEG_PATH / --ffmpeg at the binary",
                self, tool
            ),
            AppError::FfmpegFailed { command, .. } => {
                format!("❌ {}\n   Command: {}", self, command)
            }
            AppError::NotADocx { .. } => format!("⚠️  {}", self),
            _ => format!("❌ {}", self),
        }
    }
}
