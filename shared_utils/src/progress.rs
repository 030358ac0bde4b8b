//! Progress and size formatting helpers.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub mod progress_style {
    pub const PERCENT_TEMPLATE: &str =
        "{spinner:.green} {prefix:.bold} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>3}% ({eta})";
    pub const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} [{elapsed_precise}] {msg}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";
}

/// Percentage bar (0..=100) when the total is known, spinner otherwise.
pub fn create_percent_bar(prefix: &str, known_total: bool) -> ProgressBar {
    let (pb, template) = if known_total {
        (ProgressBar::new(100), progress_style::PERCENT_TEMPLATE)
    } else {
        (ProgressBar::new_spinner(), progress_style::SPINNER_TEMPLATE)
    };

    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(progress_style::PROGRESS_CHARS)
        .tick_chars(progress_style::SPINNER_CHARS);
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// `(1 - output/input) * 100`; 0 when the input is empty.
pub fn compression_ratio(input_bytes: u64, output_bytes: u64) -> f64 {
    if input_bytes == 0 {
        return 0.0;
    }
    (1.0 - output_bytes as f64 / input_bytes as f64) * 100.0
}

pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
