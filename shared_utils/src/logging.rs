//! Logging Module - 统一的日志系统
//!
//! 基于 tracing 的日志初始化：
//! - 日志文件写入日志目录（默认系统临时目录），按天轮转
//! - stderr 只输出 WARN 及以上（`--verbose` 时为 DEBUG），避免干扰命令的控制台输出
//! - target 为 [`FILE_ONLY_TARGET`] 的记录只写文件（控制台已有对应的用户提示）
//! - `RUST_LOG` 优先于程序内默认级别
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{LogConfig, init_logging};
//! use tracing::info;
//!
//! init_logging("toolbox", LogConfig::default()).expect("Failed to initialize logging");
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Environment variable that overrides the default log directory.
pub const LOG_DIR_ENV: &str = "TOOLBOX_LOG_DIR";

/// Events with this target go to the log file but never to stderr.
///
/// ```ignore
/// tracing::error!(target: FILE_ONLY_TARGET, error = %e, "Command failed");
/// ```
pub const FILE_ONLY_TARGET: &str = "toolbox_file_only";

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志目录路径（默认为系统临时目录）
    pub log_dir: PathBuf,
    /// 保留的最大日志文件数量，默认5个
    pub max_files: usize,
    /// 文件日志级别，默认Info
    pub level: Level,
    /// stderr 日志级别，默认Warn
    pub stderr_level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        let log_dir = std::env::var_os(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self {
            log_dir,
            max_files: 5,
            level: Level::INFO,
            stderr_level: Level::WARN,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    /// `--verbose`: debug everywhere, including stderr.
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = Level::DEBUG;
            self.stderr_level = Level::DEBUG;
        }
        self
    }
}

/// 初始化日志系统
///
/// 日志文件命名：`{program_name}.log.YYYY-MM-DD`。只能调用一次（全局 subscriber）。
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let log_file_name = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &log_file_name);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={level},shared_utils={level},{}={level}",
            program_name,
            FILE_ONLY_TARGET,
            level = config.level
        ))
    });

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let stderr_level = config.stderr_level;
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_line_number(false)
        .compact()
        .with_filter(filter_fn(move |meta| {
            shown_on_stderr(*meta.level(), meta.target(), stderr_level)
        }));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        program = program_name,
        log_dir = ?config.log_dir,
        log_file = log_file_name,
        max_files = config.max_files,
        level = ?config.level,
        "Logging system initialized"
    );

    cleanup_old_logs(&config.log_dir, program_name, config.max_files)?;

    Ok(())
}

/// stderr 过滤：级别不低于 `stderr_level`，且不是仅写文件的记录
fn shown_on_stderr(level: Level, target: &str, stderr_level: Level) -> bool {
    level <= stderr_level && target != FILE_ONLY_TARGET
}

/// 清理旧的日志文件，只保留最近的N个
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    use std::fs;

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let prefix = format!("{}.log", program_name);
    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_ours = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(&prefix))
            .unwrap_or(false);
        if !is_ours {
            continue;
        }

        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    if log_files.len() > max_files {
        // newest first
        log_files.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in log_files.iter().skip(max_files) {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = ?path, error = %e, "Failed to remove old log file");
            } else {
                tracing::debug!(path = ?path, "Removed old log file");
            }
        }
    }

    Ok(())
}

/// Marks the start of a command; pair with [`log_operation_end`].
pub fn log_operation_start(operation: &str) -> Instant {
    tracing::info!(operation = operation, "Operation started");
    Instant::now()
}

/// 记录操作结束
pub fn log_operation_end(operation: &str, duration: Duration, success: bool) {
    if success {
        tracing::info!(
            operation = operation,
            duration_secs = duration.as_secs_f64(),
            "Operation completed successfully"
        );
    } else {
        tracing::error!(
            target: FILE_ONLY_TARGET,
            operation = operation,
            duration_secs = duration.as_secs_f64(),
            "Operation failed"
        );
    }
}
