//! Background flush loop
//!
//! Drains the buffer into batches of at most `batch_size` events. Each cycle
//! waits up to `flush_period` in total, flushing eagerly whenever a batch
//! fills, then flushes whatever partial batch is left. Sink failures never
//! escape the loop; they are counted and parked in `LastError` for the next
//! `push` to pick up.
//!
//! On cancellation the loop closes the buffer. If the throttler is `Closed`
//! (graceful `close`) the remaining events are drained and flushed once with
//! no waiting. Otherwise (`abort`) the remaining events are dropped and
//! counted as ignored.

use std::sync::Arc;
use std::time::Duration;

use redlog_metrics::ThrottlerStats;
use redlog_sinks::{Event, Sink};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::{EventReceiver, Polled};
use crate::last_error::LastError;
use crate::state::{AtomicState, State};

pub(crate) struct FlushLoop {
    pub(crate) name: String,
    pub(crate) receiver: EventReceiver,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) stats: Arc<ThrottlerStats>,
    pub(crate) last_error: Arc<LastError>,
    pub(crate) state: Arc<AtomicState>,
    pub(crate) batch_size: usize,
    pub(crate) flush_period: Duration,
}

impl FlushLoop {
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        info!(
            throttler = %self.name,
            sink = %self.sink.name(),
            batch_size = self.batch_size,
            flush_period = ?self.flush_period,
            "flush loop started"
        );

        let mut batch = Vec::with_capacity(self.batch_size);

        'cycles: loop {
            let deadline = Instant::now() + self.flush_period;

            loop {
                // re-measured every poll so a slow sink eats into the budget
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }

                let polled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    polled = self.receiver.poll_timeout(remaining) => Some(polled),
                };

                match polled {
                    Some(Polled::Event(event)) => {
                        trace!(throttler = %self.name, size = event.len(), "event polled");
                        batch.push(event);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    Some(Polled::Timeout) => {}
                    Some(Polled::Closed) | None => break 'cycles,
                }
            }

            self.flush(&mut batch).await;
        }

        self.shutdown(batch).await;
    }

    async fn shutdown(mut self, mut batch: Vec<Event>) {
        self.receiver.close();

        if self.state.load() != State::Closed {
            let mut dropped = batch.len() as u64;
            while self.receiver.try_poll().is_some() {
                dropped += 1;
            }
            for _ in 0..dropped {
                self.stats.record_ignored();
            }
            warn!(throttler = %self.name, dropped, "flush loop aborted");
            return;
        }

        while let Some(event) = self.receiver.try_poll() {
            batch.push(event);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch).await;
            }
        }
        self.flush(&mut batch).await;

        info!(throttler = %self.name, "flush loop stopped");
    }

    /// Push `batch` to the sink and clear it
    async fn flush(&self, batch: &mut Vec<Event>) {
        if batch.is_empty() {
            return;
        }

        let events = batch.len() as u64;
        match self.sink.push_batch(&batch[..]).await {
            Ok(()) => {
                self.stats.record_push_success(events);
                debug!(throttler = %self.name, events, "batch pushed");
            }
            Err(e) => {
                // armed before the failure is counted
                let error = Arc::new(e);
                self.last_error.set(Arc::clone(&error));
                self.stats.record_push_failure(events);
                warn!(throttler = %self.name, events, error = %error, "sink push failed");
            }
        }
        batch.clear();
    }
}
