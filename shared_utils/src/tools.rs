//! External tool discovery (ffmpeg / ffprobe).
//!
//! Resolution order for ffmpeg:
//! 1. explicit path from the command line (must exist)
//! 2. `FFMPEG_PATH` environment variable, when it points at an existing file
//! 3. `ffmpeg` on `PATH`

use crate::app_error::{AppError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

/// Where the ffmpeg binary came from, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    CommandLine,
    Environment,
    SystemPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTool {
    pub path: PathBuf,
    pub source: ToolSource,
}

/// Locates ffmpeg using the process environment and `PATH`.
pub fn locate_ffmpeg(explicit: Option<&Path>) -> Result<LocatedTool> {
    let env_value = std::env::var_os(FFMPEG_PATH_ENV).map(PathBuf::from);
    resolve_ffmpeg(explicit, env_value.as_deref(), || which::which("ffmpeg").ok())
}

/// Pure resolution logic behind [`locate_ffmpeg`].
pub fn resolve_ffmpeg<F>(
    explicit: Option<&Path>,
    env_value: Option<&Path>,
    search_path: F,
) -> Result<LocatedTool>
where
    F: FnOnce() -> Option<PathBuf>,
{
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(AppError::ToolNotFound {
                tool: "ffmpeg".to_string(),
                hint: format!("{} does not exist", path.display()),
            });
        }
        return Ok(LocatedTool {
            path: path.to_path_buf(),
            source: ToolSource::CommandLine,
        });
    }

    if let Some(path) = env_value.filter(|p| !p.as_os_str().is_empty()) {
        if path.exists() {
            return Ok(LocatedTool {
                path: path.to_path_buf(),
                source: ToolSource::Environment,
            });
        }
        debug!(path = %path.display(), "FFMPEG_PATH set but missing, falling back to PATH");
    }

    search_path()
        .map(|path| LocatedTool {
            path,
            source: ToolSource::SystemPath,
        })
        .ok_or_else(|| AppError::ToolNotFound {
            tool: "ffmpeg".to_string(),
            hint: "not on PATH and FFMPEG_PATH is unset".to_string(),
        })
}

/// ffprobe next to the chosen ffmpeg, else on `PATH`.
pub fn locate_ffprobe(ffmpeg: &Path) -> Option<PathBuf> {
    sibling_ffprobe(ffmpeg)
        .filter(|p| p.is_file())
        .or_else(|| which::which("ffprobe").ok())
}

/// `/opt/ff/ffmpeg` → `/opt/ff/ffprobe`, keeping a `.exe` suffix if present.
pub fn sibling_ffprobe(ffmpeg: &Path) -> Option<PathBuf> {
    let parent = ffmpeg.parent()?;
    let name = match ffmpeg.extension() {
        Some(ext) => format!("ffprobe.{}", ext.to_string_lossy()),
        None => "ffprobe".to_string(),
    };
    Some(parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("my-ffmpeg");
        let env = dir.path().join("env-ffmpeg");
        std::fs::write(&explicit, b"").unwrap();
        std::fs::write(&env, b"").unwrap();

        let tool = resolve_ffmpeg(Some(&explicit), Some(&env), || None).unwrap();
        assert_eq!(tool.path, explicit);
        assert_eq!(tool.source, ToolSource::CommandLine);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("missing-ffmpeg");
        let err = resolve_ffmpeg(Some(&explicit), None, || Some(PathBuf::from("/usr/bin/ffmpeg")))
            .unwrap_err();
        assert!(matches!(err, AppError::ToolNotFound { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_env_used_when_existing() {
        let dir = TempDir::new().unwrap();
        let env = dir.path().join("ffmpeg");
        std::fs::write(&env, b"").unwrap();

        let tool = resolve_ffmpeg(None, Some(&env), || None).unwrap();
        assert_eq!(tool.path, env);
        assert_eq!(tool.source, ToolSource::Environment);
    }

    #[test]
    fn test_missing_env_falls_back_to_path() {
        let tool = resolve_ffmpeg(None, Some(Path::new("/definitely/not/here/ffmpeg")), || {
            Some(PathBuf::from("/usr/bin/ffmpeg"))
        })
        .unwrap();
        assert_eq!(tool.path, PathBuf::from("/usr/bin/ffmpeg"));
        assert_eq!(tool.source, ToolSource::SystemPath);
    }

    #[test]
    fn test_nothing_found() {
        let err = resolve_ffmpeg(None, None, || None).unwrap_err();
        assert!(err.to_string().contains("ffmpeg not found"));
    }

    #[test]
    fn test_sibling_ffprobe() {
        assert_eq!(
            sibling_ffprobe(Path::new("/opt/ff/ffmpeg")),
            Some(PathBuf::from("/opt/ff/ffprobe"))
        );
        assert_eq!(
            sibling_ffprobe(Path::new("C:/tools/ffmpeg.exe")),
            Some(PathBuf::from("C:/tools/ffprobe.exe"))
        );
    }
}
