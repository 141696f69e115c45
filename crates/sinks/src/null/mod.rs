//! Null sink - discards all data
//!
//! Accepts every batch, records metrics and drops the payload.
//!
//! # Use Cases
//!
//! - **Benchmarking**: measure throttler throughput without network I/O
//! - **Dry runs**: exercise a configuration without a Redis server
//!
//! # Example
//!
//! ```ignore
//! let sink = Arc::new(NullSink::with_name("dry-run"));
//! let handle = sink.metrics_handle();
//! let throttler = Throttler::new("dry-run", config, sink, registry)?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use redlog_metrics::SinkMetrics;

use crate::{Event, Sink, SinkError, SinkMetricsHandle};

/// Sink that discards all received batches
pub struct NullSink {
    name: String,
    metrics: Arc<SinkMetrics>,
}

impl NullSink {
    /// Create a null sink named "null"
    pub fn new() -> Self {
        Self::with_name("null")
    }

    /// Create a null sink with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Get a metrics handle that outlives the sink
    pub fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle::new(self.name.clone(), Arc::clone(&self.metrics))
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for NullSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push_batch(&self, events: &[Event]) -> Result<(), SinkError> {
        if events.is_empty() {
            return Ok(());
        }

        let bytes: usize = events.iter().map(|e| e.len()).sum();
        self.metrics.record_sent(events.len() as u64, bytes as u64);
        Ok(())
    }
}
