//! Reusable formatting utilities for CLI output
//!
//! Timestamps, durations, sizes and other display values used across
//! multiple commands.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};

/// Format a timestamp in local time, or "never" when absent.
///
/// # Example output
/// `2025-01-15 14:30`
pub fn format_datetime(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}

/// Format a duration with its two most significant units.
///
/// # Example output
/// - `365d 0h`
/// - `2h 15m`
/// - `5m 10s`
/// - `45s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Describe `at` relative to `now` ("in 2h 15m", "5m 10s ago")
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = at.signed_duration_since(now);
    match delta.to_std() {
        Ok(ahead) => format!("in {}", format_duration(ahead)),
        Err(_) => {
            let behind = (-delta).to_std().unwrap_or(Duration::ZERO);
            format!("{} ago", format_duration(behind))
        }
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with "…"
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
