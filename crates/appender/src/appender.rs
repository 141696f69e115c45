//! Redis appender
//!
//! Glues a [`Layout`], a [`Throttler`] and a sink together. The appender
//! adds its own lifecycle on top of the throttler's:
//!
//! ```text
//! Initialized ──start()──► Started ──stop()──► Stopping ──► Stopped
//! ```
//!
//! `append` is a no-op outside `Started`. `stop` closes the throttler
//! (final flush) before closing the sink, and is idempotent.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use redlog_config::AppenderConfig;
use redlog_metrics::{StatsRegistry, StatsSnapshot};
use redlog_sinks::redis::RedisSink;
use redlog_sinks::{Event, Sink};
use redlog_throttle::Throttler;
use tracing::{debug, info};

use crate::error::{AppenderError, Result};
use crate::layout::{Layout, layout_for};
use crate::record::LogRecord;

/// Appender lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AppenderState {
    /// Built, not yet accepting records
    Initialized = 0,
    /// Accepting records
    Started = 1,
    /// Flushing and disconnecting
    Stopping = 2,
    /// Terminal
    Stopped = 3,
}

impl AppenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Initialized,
            1 => Self::Started,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for AppenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pushes encoded log records to a Redis list through a throttler
pub struct RedisAppender {
    name: String,
    config: AppenderConfig,
    layout: Arc<dyn Layout>,
    sink: Arc<dyn Sink>,
    throttler: Throttler,
    state: AtomicU8,
}

impl RedisAppender {
    /// Build an appender writing to the configured Redis server
    ///
    /// Nothing connects until the first batch is flushed.
    ///
    /// # Errors
    ///
    /// Fails if the throttler rejects its configuration.
    pub fn new(config: AppenderConfig, registry: Arc<dyn StatsRegistry>) -> Result<Self> {
        let sink = Arc::new(RedisSink::new(config.name.clone(), config.redis.clone()));
        Self::with_sink(config, sink, registry)
    }

    /// Build an appender over any sink
    ///
    /// # Errors
    ///
    /// Fails if the throttler rejects its configuration.
    pub fn with_sink(
        config: AppenderConfig,
        sink: Arc<dyn Sink>,
        registry: Arc<dyn StatsRegistry>,
    ) -> Result<Self> {
        let throttler = Throttler::new(
            format!("{}/throttler", config.name),
            config.throttler.clone(),
            Arc::clone(&sink),
            registry,
        )?
        .ignore_exceptions(config.ignore_exceptions);

        Ok(Self {
            name: config.name.clone(),
            layout: layout_for(config.layout),
            config,
            sink,
            throttler,
            state: AtomicU8::new(AppenderState::Initialized as u8),
        })
    }

    /// Start the throttler and begin accepting records
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the appender is `Initialized`; throttler start
    /// failures (e.g. no tokio runtime).
    pub fn start(&self) -> Result<()> {
        let found = self.state();
        if found != AppenderState::Initialized {
            return Err(AppenderError::InvalidState {
                appender: self.name.clone(),
                expected: AppenderState::Initialized,
                found,
            });
        }

        info!(
            appender = %self.name,
            key = self.key(),
            sink = self.sink.name(),
            "appender starting"
        );
        self.throttler.start()?;
        self.state.store(AppenderState::Started as u8, Ordering::Release);
        Ok(())
    }

    /// Encode and push one record
    ///
    /// # Errors
    ///
    /// Encoding failures always; admission failures only when exceptions
    /// are not ignored.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        if !self.is_started() {
            return Ok(());
        }
        let event = self.layout.encode(record)?;
        self.push(event)
    }

    /// Push an already encoded event
    ///
    /// # Errors
    ///
    /// Admission failures when exceptions are not ignored.
    pub fn append_bytes(&self, event: Event) -> Result<()> {
        if !self.is_started() {
            return Ok(());
        }
        self.push(event)
    }

    fn push(&self, event: Event) -> Result<()> {
        debug!(appender = %self.name, size = event.len(), "appending");
        self.throttler.push(event)?;
        Ok(())
    }

    /// Flush what is buffered, then disconnect
    pub async fn stop(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if matches!(
                AppenderState::from_u8(current),
                AppenderState::Stopping | AppenderState::Stopped
            ) {
                return;
            }
            match self.state.compare_exchange(
                current,
                AppenderState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        info!(appender = %self.name, "appender stopping");
        self.throttler.close().await;
        self.sink.close().await;
        self.state.store(AppenderState::Stopped as u8, Ordering::Release);
        info!(appender = %self.name, "appender stopped");
    }

    /// Appender name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Redis list key
    #[inline]
    pub fn key(&self) -> &str {
        self.config.redis.key_str()
    }

    /// Configuration
    #[inline]
    pub fn config(&self) -> &AppenderConfig {
        &self.config
    }

    /// Layout in use
    pub fn layout(&self) -> &dyn Layout {
        self.layout.as_ref()
    }

    /// Underlying throttler
    #[inline]
    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    /// Throttler counters
    pub fn stats(&self) -> StatsSnapshot {
        self.throttler.snapshot()
    }

    /// Current lifecycle state
    pub fn state(&self) -> AppenderState {
        AppenderState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether records are accepted
    pub fn is_started(&self) -> bool {
        self.state() == AppenderState::Started
    }

    /// Whether `stop` has completed
    pub fn is_stopped(&self) -> bool {
        self.state() == AppenderState::Stopped
    }
}

impl fmt::Debug for RedisAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisAppender")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("layout", &self.layout.name())
            .field("key", &self.key())
            .field("address", &self.config.redis.address())
            .field("ignore_exceptions", &self.config.ignore_exceptions)
            .finish()
    }
}

#[cfg(test)]
#[path = "appender_test.rs"]
mod appender_test;
