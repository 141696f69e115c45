//! The throttler: admission control in front of a batching flush loop
//!
//! Producers call [`Throttler::push`] from any thread or task. It never
//! blocks and never touches the sink; admission runs in a fixed order:
//!
//! 1. count the event
//! 2. drop it if the throttler is not started
//! 3. drop it if the last batch failed (consuming that failure)
//! 4. event rate limit
//! 5. byte rate limit
//! 6. offer to the bounded buffer
//!
//! Every rejection is counted. Rejections are returned to the caller when
//! exceptions are not ignored, and logged (rate limited) otherwise.
//!
//! # Example
//!
//! ```ignore
//! let throttler = Throttler::new("app", config, sink, registry)?
//!     .ignore_exceptions(false);
//! throttler.start()?;
//! throttler.push(Bytes::from_static(b"hello"))?;
//! throttler.close().await;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use redlog_config::ThrottlerConfig;
use redlog_metrics::{StatsHandle, StatsRegistry, StatsSnapshot, ThrottlerStats};
use redlog_sinks::{Event, Sink};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::buffer::{EventBuffer, EventReceiver, event_buffer};
use crate::error::{Result, ThrottleError};
use crate::flush::FlushLoop;
use crate::last_error::LastError;
use crate::rate_limiter::RateLimiter;
use crate::report::ErrorReporter;
use crate::state::{AtomicState, State};

/// Bounded, rate-limited, batching event pipeline
pub struct Throttler {
    name: String,
    config: ThrottlerConfig,
    sink: Arc<dyn Sink>,

    buffer: EventBuffer,
    /// Handed to the flush loop on start
    receiver: Mutex<Option<EventReceiver>>,

    event_limiter: RateLimiter,
    byte_limiter: RateLimiter,
    reporter: ErrorReporter,
    last_error: Arc<LastError>,

    registry: Arc<dyn StatsRegistry>,
    stats: StatsHandle,

    state: Arc<AtomicState>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Throttler {
    /// Create a throttler in the `Created` state
    ///
    /// Stats are registered under the configured stats name, or `name` when
    /// none is set. Exceptions are ignored until
    /// [`ignore_exceptions(false)`](Self::ignore_exceptions).
    ///
    /// # Errors
    ///
    /// `RateLimit` if a configured rate cannot be enforced.
    pub fn new(
        name: impl Into<String>,
        config: ThrottlerConfig,
        sink: Arc<dyn Sink>,
        registry: Arc<dyn StatsRegistry>,
    ) -> Result<Self> {
        let name = name.into();

        let event_limiter = RateLimiter::new(config.max_events_per_second())?;
        let byte_limiter = RateLimiter::new(config.max_bytes_per_second())?;
        let error_limiter = RateLimiter::new(config.max_errors_per_second())?;

        let (buffer, receiver) = event_buffer(config.buffer_size());
        let stats = registry.acquire(config.stats_name().unwrap_or(name.as_str()));

        Ok(Self {
            reporter: ErrorReporter::new(name.clone(), false, error_limiter),
            name,
            config,
            sink,
            buffer,
            receiver: Mutex::new(Some(receiver)),
            event_limiter,
            byte_limiter,
            last_error: Arc::new(LastError::new()),
            registry,
            stats,
            state: Arc::new(AtomicState::new(State::Created)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        })
    }

    /// Whether admission failures are swallowed (true) or returned (false)
    #[must_use]
    pub fn ignore_exceptions(mut self, ignore: bool) -> Self {
        self.reporter.set_strict(!ignore);
        self
    }

    /// Spawn the flush loop on the current tokio runtime
    ///
    /// # Errors
    ///
    /// `NoRuntime` outside a runtime, `AlreadyStarted` on a second call and
    /// `Closed` after `close`.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| ThrottleError::NoRuntime)?;

        if let Err(current) = self.state.transition(State::Created, State::Started) {
            return Err(match current {
                State::Closed => ThrottleError::Closed,
                _ => ThrottleError::AlreadyStarted,
            });
        }

        let Some(receiver) = self.receiver.lock().take() else {
            return Err(ThrottleError::AlreadyStarted);
        };

        let flush_loop = FlushLoop {
            name: self.name.clone(),
            receiver,
            sink: Arc::clone(&self.sink),
            stats: Arc::clone(self.stats.stats()),
            last_error: Arc::clone(&self.last_error),
            state: Arc::clone(&self.state),
            batch_size: self.config.batch_size(),
            flush_period: self.config.flush_period(),
        };
        let task = runtime.spawn(flush_loop.run(self.cancel.clone()));
        *self.task.lock() = Some(task);

        info!(
            throttler = %self.name,
            stats = self.stats.name(),
            buffer_size = self.config.buffer_size(),
            max_events_per_second = self.event_limiter.max_permits_per_second(),
            max_bytes_per_second = self.byte_limiter.max_permits_per_second(),
            "throttler started"
        );
        Ok(())
    }

    /// Offer one event without blocking
    ///
    /// # Errors
    ///
    /// Only when exceptions are not ignored: the admission failure that
    /// dropped the event.
    pub fn push(&self, event: Event) -> Result<()> {
        let stats = self.stats.stats();
        stats.record_event();

        match self.state.load() {
            State::Started => {}
            State::Created => {
                stats.record_ignored();
                return self.refuse(ThrottleError::NotStarted);
            }
            State::Closed => {
                stats.record_ignored();
                return self.refuse(ThrottleError::Closed);
            }
        }

        if let Some(err) = self.last_error.take() {
            stats.record_ignored();
            return self.reporter.report(ThrottleError::SinkFailure(err));
        }

        if !self.event_limiter.try_acquire(1) {
            stats.record_event_rate_limited();
            return self.reporter.report(ThrottleError::EventRateLimited {
                max_per_second: self.event_limiter.max_permits_per_second(),
            });
        }

        let size = event.len();
        if !self.byte_limiter.try_acquire(size as u64) {
            stats.record_byte_rate_limited();
            return self.reporter.report(ThrottleError::ByteRateLimited {
                max_per_second: self.byte_limiter.max_permits_per_second(),
                size,
            });
        }

        if !self.buffer.offer(event) {
            // lost a race with close
            if self.buffer.is_closed() {
                stats.record_ignored();
                return self.refuse(ThrottleError::Closed);
            }
            stats.record_buffer_full();
            return self.reporter.report(ThrottleError::BufferFull {
                capacity: self.buffer.capacity(),
            });
        }

        Ok(())
    }

    /// Lifecycle refusals are returned in strict mode and never logged
    fn refuse(&self, err: ThrottleError) -> Result<()> {
        if self.reporter.is_strict() {
            Err(err)
        } else {
            Ok(())
        }
    }

    /// Stop the flush loop after one final flush of buffered events
    ///
    /// Waits for the loop to finish. Idempotent.
    pub async fn close(&self) {
        if self.state.swap(State::Closed) == State::Closed {
            return;
        }

        self.cancel.cancel();
        self.join().await;
        self.release_stats();

        let snapshot = self.stats.stats().snapshot();
        info!(
            throttler = %self.name,
            total = snapshot.total_events,
            pushed = snapshot.push_successes,
            failed = snapshot.push_failures,
            ignored = snapshot.ignored_events,
            rejected = snapshot.rejected(),
            "throttler closed"
        );
    }

    /// Stop the flush loop, dropping buffered events
    ///
    /// Dropped events are counted as ignored.
    pub async fn abort(&self) {
        if self.state.load() == State::Closed {
            return;
        }

        // cancelled while still Started, so the loop skips its final flush
        self.cancel.cancel();
        self.join().await;
        self.state.swap(State::Closed);
        self.release_stats();

        warn!(throttler = %self.name, "throttler aborted");
    }

    async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(throttler = %self.name, error = %e, "flush loop terminated abnormally");
        }
    }

    fn release_stats(&self) {
        if !self.stats.is_released() {
            self.registry.release(&self.stats);
        }
    }

    /// Throttler name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the stats are registered under
    #[inline]
    pub fn stats_name(&self) -> &str {
        self.stats.name()
    }

    /// Live counters
    #[inline]
    pub fn stats(&self) -> &Arc<ThrottlerStats> {
        self.stats.stats()
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.stats().snapshot()
    }

    /// Configuration
    #[inline]
    pub fn config(&self) -> &ThrottlerConfig {
        &self.config
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> State {
        self.state.load()
    }

    /// Whether pushes are being admitted
    #[inline]
    pub fn is_started(&self) -> bool {
        self.state.load() == State::Started
    }

    /// Events waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Admission failures not logged because of `max_errors_per_second`
    pub fn suppressed_errors(&self) -> u64 {
        self.reporter.suppressed()
    }
}

impl Drop for Throttler {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.release_stats();
    }
}

impl std::fmt::Debug for Throttler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttler")
            .field("name", &self.name)
            .field("sink", &self.sink.name())
            .field("state", &self.state.load())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "throttler_test.rs"]
mod throttler_test;
