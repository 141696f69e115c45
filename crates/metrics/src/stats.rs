//! Throttler statistics
//!
//! One `ThrottlerStats` per registered name. Producers record admission
//! outcomes, the flush loop records delivery outcomes.

use serde::Serialize;

use crate::Counter;

/// Counters of a single throttler
///
/// Every pushed event ends up in exactly one of: ignored, event rate
/// limited, byte rate limited, buffer full, or (once flushed) pushed or
/// failed.
#[derive(Debug, Default)]
pub struct ThrottlerStats {
    total_events: Counter,
    ignored_events: Counter,
    event_rate_limit_failures: Counter,
    byte_rate_limit_failures: Counter,
    unavailable_buffer_space_failures: Counter,
    push_failures: Counter,
    push_successes: Counter,
}

impl ThrottlerStats {
    /// Create stats with every counter at zero
    pub const fn new() -> Self {
        Self {
            total_events: Counter::new(),
            ignored_events: Counter::new(),
            event_rate_limit_failures: Counter::new(),
            byte_rate_limit_failures: Counter::new(),
            unavailable_buffer_space_failures: Counter::new(),
            push_failures: Counter::new(),
            push_successes: Counter::new(),
        }
    }

    /// Record an event handed to the throttler
    #[inline]
    pub fn record_event(&self) {
        self.total_events.inc();
    }

    /// Record an event dropped because the throttler was not running or a
    /// previous flush failed
    #[inline]
    pub fn record_ignored(&self) {
        self.ignored_events.inc();
    }

    /// Record an event denied by the event rate limiter
    #[inline]
    pub fn record_event_rate_limited(&self) {
        self.event_rate_limit_failures.inc();
    }

    /// Record an event denied by the byte rate limiter
    #[inline]
    pub fn record_byte_rate_limited(&self) {
        self.byte_rate_limit_failures.inc();
    }

    /// Record an event dropped because the buffer was full
    #[inline]
    pub fn record_buffer_full(&self) {
        self.unavailable_buffer_space_failures.inc();
    }

    /// Record a batch of `events` accepted by the sink
    #[inline]
    pub fn record_push_success(&self, events: u64) {
        self.push_successes.add(events);
    }

    /// Record a batch of `events` the sink failed to accept
    #[inline]
    pub fn record_push_failure(&self, events: u64) {
        self.push_failures.add(events);
    }

    /// Total events handed to the throttler
    #[inline]
    pub fn total_events(&self) -> u64 {
        self.total_events.get()
    }

    /// Events ignored before admission
    #[inline]
    pub fn ignored_events(&self) -> u64 {
        self.ignored_events.get()
    }

    /// Events accepted by the sink
    #[inline]
    pub fn push_successes(&self) -> u64 {
        self.push_successes.get()
    }

    /// Events in batches the sink rejected
    #[inline]
    pub fn push_failures(&self) -> u64 {
        self.push_failures.get()
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_events: self.total_events.get(),
            ignored_events: self.ignored_events.get(),
            event_rate_limit_failures: self.event_rate_limit_failures.get(),
            byte_rate_limit_failures: self.byte_rate_limit_failures.get(),
            unavailable_buffer_space_failures: self.unavailable_buffer_space_failures.get(),
            push_failures: self.push_failures.get(),
            push_successes: self.push_successes.get(),
        }
    }
}

/// Point-in-time copy of [`ThrottlerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_events: u64,
    pub ignored_events: u64,
    pub event_rate_limit_failures: u64,
    pub byte_rate_limit_failures: u64,
    pub unavailable_buffer_space_failures: u64,
    pub push_failures: u64,
    pub push_successes: u64,
}

impl StatsSnapshot {
    /// Events rejected at admission (both rate limits and full buffer)
    pub fn rejected(&self) -> u64 {
        self.event_rate_limit_failures
            + self.byte_rate_limit_failures
            + self.unavailable_buffer_space_failures
    }

    /// Events whose outcome is known
    pub fn accounted(&self) -> u64 {
        self.ignored_events + self.rejected() + self.push_successes + self.push_failures
    }

    /// Whether every event has an outcome
    ///
    /// Only meaningful when nothing is buffered or in flight.
    pub fn is_reconciled(&self) -> bool {
        self.total_events == self.accounted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = ThrottlerStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert!(stats.snapshot().is_reconciled());
    }

    #[test]
    fn test_record_each_outcome() {
        let stats = ThrottlerStats::new();
        for _ in 0..20 {
            stats.record_event();
        }
        stats.record_ignored();
        stats.record_event_rate_limited();
        stats.record_event_rate_limited();
        stats.record_byte_rate_limited();
        stats.record_buffer_full();
        stats.record_push_success(10);
        stats.record_push_failure(5);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_events, 20);
        assert_eq!(snapshot.ignored_events, 1);
        assert_eq!(snapshot.event_rate_limit_failures, 2);
        assert_eq!(snapshot.byte_rate_limit_failures, 1);
        assert_eq!(snapshot.unavailable_buffer_space_failures, 1);
        assert_eq!(snapshot.push_successes, 10);
        assert_eq!(snapshot.push_failures, 5);
        assert_eq!(snapshot.rejected(), 4);
        assert!(snapshot.is_reconciled());
    }

    #[test]
    fn test_in_flight_events_not_reconciled() {
        let stats = ThrottlerStats::new();
        stats.record_event();
        stats.record_event();
        stats.record_push_success(1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.accounted(), 1);
        assert!(!snapshot.is_reconciled());
    }

    #[test]
    fn test_snapshot_serializes_all_counters() {
        let stats = ThrottlerStats::new();
        stats.record_event();
        stats.record_push_success(1);

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["total_events"], 1);
        assert_eq!(json["push_successes"], 1);
        assert_eq!(json.as_object().unwrap().len(), 7);
    }
}
