//! Test helpers shared by the appender test suites

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redlog_config::{AppenderConfig, ThrottlerConfig};
use redlog_metrics::{SharedStatsRegistry, StatsRegistry};
use redlog_sinks::{Event, Sink, SinkError};

use crate::appender::RedisAppender;

/// Records every batch it receives
#[derive(Default)]
pub(crate) struct RecordingSink {
    batches: Mutex<Vec<Vec<Event>>>,
    closed: Mutex<bool>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn push_batch(&self, events: &[Event]) -> Result<(), SinkError> {
        self.batches.lock().push(events.to_vec());
        Ok(())
    }

    async fn close(&self) {
        *self.closed.lock() = true;
    }
}

/// Small buffer, long flush period: events arrive on stop
pub(crate) fn test_config(name: &str) -> AppenderConfig {
    let mut config = AppenderConfig::new(name, format!("{name}-logs"));
    config.throttler = ThrottlerConfig::builder()
        .buffer_size(100)
        .batch_size(10)
        .flush_period(Duration::from_secs(60))
        .build()
        .unwrap();
    config
}

pub(crate) fn recording_appender(
    config: AppenderConfig,
) -> (Arc<RedisAppender>, Arc<RecordingSink>, Arc<dyn StatsRegistry>) {
    let sink = Arc::new(RecordingSink::default());
    let registry = SharedStatsRegistry::shared();
    let appender = RedisAppender::with_sink(config, sink.clone(), registry.clone()).unwrap();
    (Arc::new(appender), sink, registry)
}
