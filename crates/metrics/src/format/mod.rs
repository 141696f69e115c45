//! Stats output formatters
//!
//! Formats throttler and sink snapshots for human-readable or JSON output.

mod human;
mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use redlog_config::MetricsFormat;

use crate::{SinkMetricsSnapshot, StatsSnapshot};

/// Trait for stats formatters
pub trait StatsFormatter: Send + Sync {
    /// Format one throttler's counters
    fn format_stats(&self, name: &str, snapshot: &StatsSnapshot, interval_secs: u64) -> String;

    /// Format one sink's counters
    fn format_sink(&self, name: &str, snapshot: &SinkMetricsSnapshot) -> String;
}

/// Formatter for the configured output format
pub fn formatter_for(format: MetricsFormat) -> Box<dyn StatsFormatter> {
    match format {
        MetricsFormat::Human => Box::new(HumanFormatter::new()),
        MetricsFormat::Json => Box::new(JsonFormatter::new()),
    }
}

/// Format bytes in human-readable form (KB, MB, GB)
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format count with K/M suffix for readability
pub fn format_count(count: u64) -> String {
    const K: u64 = 1000;
    const M: u64 = 1_000_000;

    if count >= M {
        format!("{:.1}M", count as f64 / M as f64)
    } else if count >= K {
        format!("{:.1}K", count as f64 / K as f64)
    } else {
        count.to_string()
    }
}
