//! JSON stats formatter
//!
//! # Example Output
//!
//! ```json
//! {"type":"throttler","name":"orders/throttler","period_secs":60,"total_events":12400,...}
//! ```

use super::StatsFormatter;
use crate::{SinkMetricsSnapshot, StatsSnapshot};
use serde::Serialize;

/// JSON stats formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ThrottlerReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    name: &'a str,
    period_secs: u64,
    #[serde(flatten)]
    counters: &'a StatsSnapshot,
    rejected: u64,
}

#[derive(Serialize)]
struct SinkReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    name: &'a str,
    #[serde(flatten)]
    counters: &'a SinkMetricsSnapshot,
}

impl StatsFormatter for JsonFormatter {
    fn format_stats(&self, name: &str, snapshot: &StatsSnapshot, interval_secs: u64) -> String {
        let json = ThrottlerReportJson {
            report_type: "throttler",
            name,
            period_secs: interval_secs,
            counters: snapshot,
            rejected: snapshot.rejected(),
        };

        // Compact JSON, one report per log line
        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_sink(&self, name: &str, snapshot: &SinkMetricsSnapshot) -> String {
        let json = SinkReportJson {
            report_type: "sink",
            name,
            counters: snapshot,
        };

        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}
