//! Sink delivery metrics
//!
//! Kept by each sink and exposed through a cloneable handle, so the
//! counters stay readable after the sink moves into a throttler.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Delivery counters of a sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Batches accepted by the destination
    pub batches_sent: AtomicU64,
    /// Batches that failed
    pub batches_failed: AtomicU64,
    /// Events accepted by the destination
    pub events_sent: AtomicU64,
    /// Payload bytes accepted by the destination
    pub bytes_sent: AtomicU64,
    /// Connections established
    pub connects: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            batches_sent: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            events_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            connects: AtomicU64::new(0),
        }
    }

    /// Record a delivered batch
    #[inline]
    pub fn record_sent(&self, events: u64, bytes: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.events_sent.fetch_add(events, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed batch
    #[inline]
    pub fn record_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a new connection
    #[inline]
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    #[inline]
    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkMetricsSnapshot {
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub events_sent: u64,
    pub bytes_sent: u64,
    pub connects: u64,
}
