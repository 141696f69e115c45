//! Redlog - Metrics
//!
//! Operational counters for the throttling pipeline.
//!
//! # Overview
//!
//! This crate provides:
//! - `ThrottlerStats`: the seven monotonic counters of one throttler
//! - `StatsRegistry`: reference-counted registration of stats by name
//! - `SinkMetrics`: delivery counters kept by sinks
//! - `StatsReporter`: periodic logging of every registered throttler
//!
//! # Design Principles
//!
//! - **Lock-free**: counters are relaxed atomics, safe from any thread
//! - **Never reset**: counters only grow for the lifetime of the stats
//! - **No cross-counter atomicity**: a snapshot reads each counter
//!   independently, so totals reconcile only when the pipeline is quiescent
//!
//! # Registry Pattern
//!
//! ```text
//! Throttler::new ──► registry.acquire(name) → StatsHandle (shared Arc)
//!        │
//!        ├──► producers / flush loop record into the Arc
//!        │
//! Throttler::close ──► registry.release(&handle)
//!                      (entry removed when the last holder releases)
//! ```

pub mod format;
mod registry;
mod reporter;
mod sink;
mod stats;

pub use format::{HumanFormatter, JsonFormatter, StatsFormatter};
pub use registry::{SharedStatsRegistry, StatsHandle, StatsRegistry};
pub use reporter::{StatsReporter, spawn_stats_reporter};
pub use sink::{SinkMetrics, SinkMetricsSnapshot};
pub use stats::{StatsSnapshot, ThrottlerStats};

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic atomic counter
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
