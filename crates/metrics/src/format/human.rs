//! Human-readable stats formatter
//!
//! # Example Output
//!
//! ```text
//! [throttler:orders/throttler] period: 60s | total: 12.4K | pushed: 12.1K | failed: 0 | ignored: 0 | rejected: 300 (rate 300, bytes 0, full 0)
//! [sink:orders] batches: 121 (0 failed) | events: 12.1K | bytes: 3.2 MB | connects: 1
//! ```

use super::{StatsFormatter, format_bytes, format_count};
use crate::{SinkMetricsSnapshot, StatsSnapshot};

/// Human-readable stats formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    /// Create a new human formatter
    pub fn new() -> Self {
        Self
    }
}

impl StatsFormatter for HumanFormatter {
    fn format_stats(&self, name: &str, snapshot: &StatsSnapshot, interval_secs: u64) -> String {
        format!(
            "[throttler:{}] period: {}s | total: {} | pushed: {} | failed: {} | ignored: {} | rejected: {} (rate {}, bytes {}, full {})",
            name,
            interval_secs,
            format_count(snapshot.total_events),
            format_count(snapshot.push_successes),
            format_count(snapshot.push_failures),
            format_count(snapshot.ignored_events),
            format_count(snapshot.rejected()),
            snapshot.event_rate_limit_failures,
            snapshot.byte_rate_limit_failures,
            snapshot.unavailable_buffer_space_failures,
        )
    }

    fn format_sink(&self, name: &str, snapshot: &SinkMetricsSnapshot) -> String {
        format!(
            "[sink:{}] batches: {} ({} failed) | events: {} | bytes: {} | connects: {}",
            name,
            format_count(snapshot.batches_sent),
            snapshot.batches_failed,
            format_count(snapshot.events_sent),
            format_bytes(snapshot.bytes_sent),
            snapshot.connects,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stats() {
        let formatter = HumanFormatter::new();
        let snapshot = StatsSnapshot {
            total_events: 12_400,
            ignored_events: 0,
            event_rate_limit_failures: 300,
            byte_rate_limit_failures: 0,
            unavailable_buffer_space_failures: 0,
            push_failures: 0,
            push_successes: 12_100,
        };

        let output = formatter.format_stats("orders/throttler", &snapshot, 60);

        assert!(output.contains("[throttler:orders/throttler]"));
        assert!(output.contains("period: 60s"));
        assert!(output.contains("total: 12.4K"));
        assert!(output.contains("pushed: 12.1K"));
        assert!(output.contains("rejected: 300 (rate 300, bytes 0, full 0)"));
    }

    #[test]
    fn test_format_sink() {
        let formatter = HumanFormatter::new();
        let snapshot = SinkMetricsSnapshot {
            batches_sent: 121,
            batches_failed: 2,
            events_sent: 12_100,
            bytes_sent: 3 * 1024 * 1024,
            connects: 1,
        };

        let output = formatter.format_sink("orders", &snapshot);

        assert!(output.contains("[sink:orders]"));
        assert!(output.contains("batches: 121 (2 failed)"));
        assert!(output.contains("bytes: 3.0 MB"));
    }
}
