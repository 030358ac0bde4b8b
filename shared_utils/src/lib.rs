//! Shared Utilities for the media toolbox
//!
//! - Logging bootstrap (tracing, rolling log file)
//! - Unified error type and exit codes
//! - FFmpeg process wrapper, progress parser, ffprobe duration lookup
//! - External tool discovery
//! - Directory listing and path helpers
//! - Size / ratio formatting, progress bars

pub mod app_error;
pub mod batch;
pub mod common_utils;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod progress;
pub mod tools;

pub use app_error::{AppError, Result};
pub use batch::{collect_files, COMPRESS_EXTENSIONS, GRID_EXTENSIONS};
pub use common_utils::{
    ensure_dir_exists, ensure_parent_dir_exists, file_size, get_extension_lowercase,
    has_extension, resolve_from_cwd,
};
pub use ffmpeg_process::{command_line, format_ffmpeg_error, FfmpegProcess, FfmpegProgressParser};
pub use ffprobe::{read_duration, read_duration_lossy};
pub use progress::{
    compression_ratio, create_percent_bar, format_bytes, format_duration, format_kb, format_mb,
};
pub use tools::{locate_ffmpeg, locate_ffprobe, LocatedTool, ToolSource};
