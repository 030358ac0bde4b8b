//! FFmpeg 进程管理模块 - 防止管道死锁
//!
//! stdout 用于读取 `-progress pipe:1` 的进度输出，stderr 由独立线程持续消耗，
//! 避免 stderr 缓冲区写满（约 64KB）后 ffmpeg 阻塞、两边互相等待。
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::FfmpegProcess;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.args(["-i", "input.mov", "-progress", "pipe:1", "output.mp4"]);
//! let mut process = FfmpegProcess::spawn(&mut cmd)?;
//! // read process.take_stdout() ...
//! let (status, stderr) = process.wait_with_output()?;
//! ```

use crate::logging::FILE_ONLY_TARGET;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

// ═══════════════════════════════════════════════════════════════
// FfmpegProcess - 防死锁的 FFmpeg 进程包装器
// ═══════════════════════════════════════════════════════════════

pub struct FfmpegProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<String>>,
}

impl FfmpegProcess {
    /// 启动 FFmpeg 进程（stdout/stderr 自动设为 piped）
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        info!(command = %command_line(cmd), "Executing FFmpeg command");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture FFmpeg stderr"))?;

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(|l| l.ok()) {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Take stdout（转移所有权）
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// 等待进程完成，返回 (ExitStatus, stderr 内容)
    pub fn wait_with_output(mut self) -> Result<(ExitStatus, String)> {
        let status = self.child.wait().context("Failed to wait for FFmpeg")?;
        let stderr = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        if status.success() {
            info!(exit_code = status.code(), "FFmpeg process completed successfully");
            debug!(stderr_output = %stderr, "FFmpeg stderr output");
        } else {
            // the console gets the condensed line from format_ffmpeg_error
            error!(
                target: FILE_ONLY_TARGET,
                exit_code = status.code(),
                stderr_output = %stderr,
                "FFmpeg process failed"
            );
        }

        Ok((status, stderr))
    }

    /// 强制终止进程
    pub fn kill(&mut self) -> Result<()> {
        self.child.kill().context("Failed to kill FFmpeg process")
    }
}

/// Renders a `Command` as a shell-like line for display and logs.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| {
            let s = s.to_string_lossy();
            if s.is_empty() || s.contains(char::is_whitespace) {
                format!("\"{}\"", s)
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ═══════════════════════════════════════════════════════════════
// FfmpegProgressParser - `-progress` 输出解析
// ═══════════════════════════════════════════════════════════════

/// 解析 `-progress pipe:1` 的 `key=value` 行。
///
/// 关心的键：
/// - `out_time_us` / `out_time_ms`（两者单位均为微秒）/ `out_time=HH:MM:SS.micro`
/// - `frame`、`speed=1.5x`
/// - `progress=continue|end`
#[derive(Debug, Clone)]
pub struct FfmpegProgressParser {
    total_duration: Option<f64>,
    current_time: f64,
    current_frame: u64,
    current_speed: f64,
    finished: bool,
}

impl FfmpegProgressParser {
    /// `total_duration` in seconds, when known (from ffprobe).
    pub fn new(total_duration: Option<f64>) -> Self {
        Self {
            total_duration: total_duration.filter(|d| *d > 0.0),
            current_time: 0.0,
            current_frame: 0,
            current_speed: 0.0,
            finished: false,
        }
    }

    /// 解析一行，返回进度 (0.0 - 1.0)，无法计算时返回 None
    pub fn parse_line(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key {
            // ffmpeg 的 out_time_ms 实际也是微秒
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    if us >= 0 {
                        self.current_time = us as f64 / 1_000_000.0;
                    }
                }
            }
            "out_time" => {
                if let Some(t) = Self::parse_time(value) {
                    self.current_time = t;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse::<u64>() {
                    self.current_frame = frame;
                }
            }
            "speed" => {
                if let Ok(speed) = value.trim_end_matches('x').trim().parse::<f64>() {
                    self.current_speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    self.finished = true;
                    return Some(1.0);
                }
            }
            _ => return None,
        }

        self.progress()
    }

    /// 解析时间字符串 (HH:MM:SS.micro)
    fn parse_time(time_str: &str) -> Option<f64> {
        let parts: Vec<&str> = time_str.split(':').collect();
        if parts.len() != 3 {
            return None;
        }

        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;

        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    }

    pub fn progress(&self) -> Option<f64> {
        if self.finished {
            return Some(1.0);
        }
        let total = self.total_duration?;
        Some((self.current_time / total).clamp(0.0, 1.0))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }
}

// ═══════════════════════════════════════════════════════════════
// FFmpeg 错误格式化
// ═══════════════════════════════════════════════════════════════

/// 从 stderr 中提取最有意义的一行错误信息。
///
/// 1. 优先取最后一行包含 "Error"/"error" 的内容
/// 2. 否则取最后一行非进度、非空内容
/// 3. 全空时返回 "Unknown FFmpeg error"
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}
