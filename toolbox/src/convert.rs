//! `convert` - transcode a video (usually `.mov`) into an H.264 + AAC `.mp4`.
//!
//! The transcoding itself is ffmpeg's job; this module picks the binary,
//! builds the argument list, and turns `-progress pipe:1` output into a bar.

use clap::ValueEnum;
use shared_utils::common_utils::file_stem_lossy;
use shared_utils::{
    command_line, create_percent_bar, ensure_parent_dir_exists, file_size, format_bytes,
    format_duration,
    format_ffmpeg_error, locate_ffmpeg, locate_ffprobe, read_duration_lossy, AppError,
    FfmpegProcess, FfmpegProgressParser, Result,
};
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::{debug, info, warn};

/// x264 `-preset` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub preset: Preset,
    /// `-F`: explicit ffmpeg binary, wins over `FFMPEG_PATH`.
    pub ffmpeg: Option<PathBuf>,
}

impl ConvertOptions {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            output: None,
            preset: Preset::default(),
            ffmpeg: None,
        }
    }
}

/// `<input dir>/<stem>.mp4`
pub fn default_output_path(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("{}.mp4", file_stem_lossy(input)))
}

/// Full ffmpeg argument list (without the program itself).
pub fn ffmpeg_args(input: &Path, output: &Path, preset: Preset) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(20);
    args.push("-y".into());
    args.push("-i".into());
    args.push(input.as_os_str().to_owned());
    for arg in [
        "-c:v",
        "libx264",
        "-c:a",
        "aac",
        "-preset",
        preset.as_str(),
        "-movflags",
        "faststart",
        "-pix_fmt",
        "yuv420p",
        "-progress",
        "pipe:1",
        "-nostats",
    ] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_owned());
    args
}

/// Runs the conversion and returns the output path.
pub fn convert_video(opts: &ConvertOptions) -> Result<PathBuf> {
    let ffmpeg = locate_ffmpeg(opts.ffmpeg.as_deref())?;
    info!(ffmpeg = %ffmpeg.path.display(), source = ?ffmpeg.source, "Using ffmpeg");

    let input = &opts.input;
    if !input.exists() {
        return Err(AppError::InputNotFound {
            path: input.clone(),
        });
    }
    if !input.is_file() {
        return Err(AppError::NotAFile {
            path: input.clone(),
        });
    }

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));
    if output == *input {
        return Err(AppError::InvalidArgument(format!(
            "output would overwrite the input: {}",
            output.display()
        )));
    }
    ensure_parent_dir_exists(&output)?;

    let duration = locate_ffprobe(&ffmpeg.path).and_then(|ffprobe| read_duration_lossy(&ffprobe, input));

    let mut cmd = Command::new(&ffmpeg.path);
    cmd.args(ffmpeg_args(input, &output, opts.preset));
    let command = command_line(&cmd);
    println!("🎬 Starting conversion...\n{}", command);

    let start = Instant::now();
    let mut process = FfmpegProcess::spawn(&mut cmd)?;
    let pb = create_percent_bar("converting", duration.is_some());

    let mut parser = FfmpegProgressParser::new(duration);
    if let Some(stdout) = process.take_stdout() {
        for line in BufReader::new(stdout).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Lost ffmpeg progress stream");
                    let _ = process.kill();
                    break;
                }
            };
            match parser.parse_line(&line) {
                Some(p) => pb.set_position((p * 100.0).round() as u64),
                None if line.starts_with("out_time") => pb.set_message(spinner_message(&parser)),
                None => {}
            }
        }
    }
    debug!(
        finished = parser.is_finished(),
        frames = parser.current_frame(),
        speed = parser.current_speed(),
        "ffmpeg progress stream closed"
    );

    let (status, stderr) = process.wait_with_output()?;
    if !status.success() {
        pb.abandon();
        return Err(AppError::FfmpegFailed {
            message: format_ffmpeg_error(&stderr),
            exit_code: status.code(),
            command,
        });
    }

    pb.finish_and_clear();
    let size = file_size(&output).map(format_bytes).unwrap_or_else(|_| "?".to_string());
    println!(
        "✅ Done: {} ({}, {})",
        output.display(),
        size,
        format_duration(start.elapsed())
    );
    Ok(output)
}

/// Spinner text when the total duration is unknown.
pub fn spinner_message(parser: &FfmpegProgressParser) -> String {
    let mut msg = format!("{:.1}s encoded", parser.current_time());
    if parser.current_frame() > 0 {
        msg.push_str(&format!(", frame {}", parser.current_frame()));
    }
    if parser.current_speed() > 0.0 {
        msg.push_str(&format!(", {:.2}x", parser.current_speed()));
    }
    msg
}
