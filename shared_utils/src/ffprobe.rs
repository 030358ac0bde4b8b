//! ffprobe wrapper module
//!
//! Only the container duration is needed (to turn ffmpeg's `out_time` into a
//! percentage), read from `ffprobe -of json` output.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    // ffprobe prints numbers as strings
    #[serde(default)]
    duration: Option<String>,
}

/// Parses `ffprobe -show_entries format=duration -of json` output.
pub fn parse_duration_json(json: &str) -> Result<Option<f64>> {
    let parsed: FfprobeOutput =
        serde_json::from_str(json).context("Failed to parse ffprobe JSON output")?;

    Ok(parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0))
}

/// Reads the media duration in seconds.
pub fn read_duration(ffprobe: &Path, input: &Path) -> Result<Option<f64>> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(input)
        .output()
        .with_context(|| format!("Failed to execute {}", ffprobe.display()))?;

    if !output.status.success() {
        bail!(
            "ffprobe exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration = parse_duration_json(&String::from_utf8_lossy(&output.stdout))?;
    debug!(input = %input.display(), ?duration, "Read duration");
    Ok(duration)
}

/// Like [`read_duration`] but any failure just means "unknown".
pub fn read_duration_lossy(ffprobe: &Path, input: &Path) -> Option<f64> {
    match read_duration(ffprobe, input) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "Could not read duration, progress percentage disabled");
            None
        }
    }
}
