//! Tests for the throttler and its flush loop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use redlog_config::ThrottlerConfig;
use redlog_metrics::{SharedStatsRegistry, StatsRegistry};
use redlog_sinks::{Event, Sink, SinkError};
use tokio::sync::Notify;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use super::Throttler;
use crate::error::ThrottleError;
use crate::state::State;

// ============================================================================
// Test sinks
// ============================================================================

/// Records every batch it receives
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<Event>>>,
}

impl RecordingSink {
    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }

    fn events(&self) -> Vec<Event> {
        self.batches.lock().iter().flatten().cloned().collect()
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
}

/// Fails the first `failures` calls, then records like `RecordingSink`
struct FailingSink {
    failures: AtomicUsize,
    inner: RecordingSink,
}

impl FailingSink {
    fn new(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            inner: RecordingSink::default(),
        }
    }
}

#[async_trait]
impl Sink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn push_batch(&self, events: &[Event]) -> Result<(), SinkError> {
        let failing = self
            .failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::write("injected failure"));
        }
        self.inner.push_batch(events).await
    }
}

/// Blocks every call until released
struct StallingSink {
    stalled: AtomicBool,
    gate: Notify,
    calls: AtomicUsize,
    inner: RecordingSink,
}

impl StallingSink {
    fn new() -> Self {
        Self {
            stalled: AtomicBool::new(true),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            inner: RecordingSink::default(),
        }
    }

    fn release(&self) {
        self.stalled.store(false, Ordering::Release);
        self.gate.notify_waiters();
    }
}

#[async_trait]
impl Sink for StallingSink {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn push_batch(&self, events: &[Event]) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        loop {
            let notified = self.gate.notified();
            if !self.stalled.load(Ordering::Acquire) {
                break;
            }
            notified.await;
        }
        self.inner.push_batch(events).await
    }
}

/// Sleeps on every warning, holding the flush loop inside its log call
struct SlowWarnings(Duration);

impl<S: tracing::Subscriber> Layer<S> for SlowWarnings {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            std::thread::sleep(self.0);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn config(buffer_size: usize, batch_size: usize, flush_period: Duration) -> ThrottlerConfig {
    ThrottlerConfig::builder()
        .buffer_size(buffer_size)
        .batch_size(batch_size)
        .flush_period(flush_period)
        .build()
        .unwrap()
}

fn throttler(config: ThrottlerConfig, sink: Arc<dyn Sink>) -> Throttler {
    Throttler::new("test", config, sink, SharedStatsRegistry::shared()).unwrap()
}

fn event(i: usize) -> Event {
    Bytes::from(format!("event-{i}"))
}

/// Poll `condition` until it holds, failing after 5 seconds
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// Ordering and batching
// ============================================================================

#[tokio::test]
async fn test_single_producer_fifo() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(1000, 10, Duration::from_millis(50)), sink.clone());
    throttler.start().unwrap();

    let pushed: Vec<Event> = (0..100).map(event).collect();
    for e in &pushed {
        throttler.push(e.clone()).unwrap();
    }
    throttler.close().await;

    assert_eq!(sink.events(), pushed);
    assert!(sink.batch_sizes().iter().all(|&size| size <= 10));
}

#[tokio::test]
async fn test_batches_split_at_batch_size() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(100, 10, Duration::from_secs(60)), sink.clone());
    throttler.start().unwrap();

    for i in 0..25 {
        throttler.push(event(i)).unwrap();
    }
    throttler.close().await;

    assert_eq!(sink.batch_sizes(), vec![10, 10, 5]);
    assert_eq!(throttler.snapshot().push_successes, 25);
}

#[tokio::test]
async fn test_partial_batch_flushed_within_period() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(100, 50, Duration::from_millis(500)), sink.clone());
    throttler.start().unwrap();

    let first_push = Instant::now();
    for i in 0..5 {
        throttler.push(event(i)).unwrap();
    }

    wait_until(|| throttler.stats().push_successes() == 5).await;
    // one period plus scheduling slack
    assert!(first_push.elapsed() < Duration::from_millis(1500));
    assert_eq!(sink.batch_sizes(), vec![5]);

    throttler.close().await;
}

#[tokio::test]
async fn test_close_flushes_final_partial_batch() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(100, 10, Duration::from_secs(60)), sink.clone());
    throttler.start().unwrap();

    for i in 0..9 {
        throttler.push(event(i)).unwrap();
    }
    assert!(sink.batch_sizes().is_empty());

    throttler.close().await;

    assert_eq!(sink.batch_sizes(), vec![9]);
    assert_eq!(sink.events(), (0..9).map(event).collect::<Vec<_>>());
    assert_eq!(throttler.state(), State::Closed);
}

// ============================================================================
// Circuit breaker
// ============================================================================

#[tokio::test]
async fn test_failure_ignores_exactly_one_push() {
    let sink = Arc::new(FailingSink::new(1));
    let throttler = throttler(config(10, 1, Duration::from_millis(20)), sink.clone());
    throttler.start().unwrap();

    throttler.push(event(1)).unwrap();
    wait_until(|| throttler.stats().push_failures() == 1).await;

    // consumes the failure; not buffered
    throttler.push(event(2)).unwrap();
    assert_eq!(throttler.stats().ignored_events(), 1);
    assert_eq!(throttler.buffered(), 0);

    throttler.push(event(3)).unwrap();
    wait_until(|| throttler.stats().push_successes() == 1).await;
    throttler.close().await;

    assert_eq!(sink.inner.events(), vec![event(3)]);
    let snapshot = throttler.snapshot();
    assert_eq!(snapshot.ignored_events, 1);
    assert_eq!(snapshot.push_failures, 1);
    assert!(snapshot.is_reconciled());
}

#[tokio::test]
async fn test_failure_armed_before_it_is_counted() {
    // the flush loop shares this thread, so it sees the slow subscriber
    let _guard = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(SlowWarnings(Duration::from_millis(50))),
    );
    let sink = Arc::new(FailingSink::new(1));
    let throttler = Arc::new(throttler(
        config(10, 1, Duration::from_millis(20)),
        sink.clone(),
    ));
    throttler.start().unwrap();
    throttler.push(event(1)).unwrap();

    let producer = Arc::clone(&throttler);
    let ignored = tokio::task::spawn_blocking(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while producer.stats().push_failures() == 0 {
            assert!(Instant::now() < deadline, "failure not counted within 5s");
            std::hint::spin_loop();
        }
        producer.push(event(2)).unwrap();
        producer.stats().ignored_events()
    })
    .await
    .unwrap();
    assert_eq!(ignored, 1);

    throttler.close().await;
    assert!(sink.inner.events().is_empty());
    assert!(throttler.snapshot().is_reconciled());
}

#[tokio::test]
async fn test_failure_returned_in_strict_mode() {
    let sink = Arc::new(FailingSink::new(1));
    let throttler =
        throttler(config(10, 1, Duration::from_millis(20)), sink.clone()).ignore_exceptions(false);
    throttler.start().unwrap();

    throttler.push(event(1)).unwrap();
    wait_until(|| throttler.stats().push_failures() == 1).await;

    let err = throttler.push(event(2)).unwrap_err();
    match err {
        ThrottleError::SinkFailure(cause) => {
            assert!(cause.to_string().contains("injected failure"));
        }
        other => panic!("expected SinkFailure, got {other:?}"),
    }

    throttler.push(event(3)).unwrap();
    throttler.close().await;
    assert_eq!(sink.inner.events(), vec![event(3)]);
}

// ============================================================================
// Back-pressure and rate limiting
// ============================================================================

#[tokio::test]
async fn test_full_buffer_drops_without_blocking() {
    let sink = Arc::new(StallingSink::new());
    let throttler = throttler(config(5, 2, Duration::from_secs(60)), sink.clone());
    throttler.start().unwrap();

    // the loop takes two events and stalls in the sink
    throttler.push(event(0)).unwrap();
    throttler.push(event(1)).unwrap();
    wait_until(|| sink.calls.load(Ordering::Acquire) == 1).await;

    for i in 2..7 {
        throttler.push(event(i)).unwrap();
    }
    assert_eq!(throttler.buffered(), 5);

    throttler.push(event(7)).unwrap();
    let snapshot = throttler.snapshot();
    assert_eq!(snapshot.unavailable_buffer_space_failures, 1);
    assert_eq!(snapshot.total_events, 8);

    sink.release();
    throttler.close().await;

    let snapshot = throttler.snapshot();
    assert_eq!(snapshot.push_successes, 7);
    assert!(snapshot.is_reconciled());
    assert_eq!(sink.inner.events(), (0..7).map(event).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_full_buffer_returned_in_strict_mode() {
    let sink = Arc::new(StallingSink::new());
    let throttler =
        throttler(config(2, 1, Duration::from_secs(60)), sink.clone()).ignore_exceptions(false);
    throttler.start().unwrap();

    throttler.push(event(0)).unwrap();
    wait_until(|| sink.calls.load(Ordering::Acquire) == 1).await;
    throttler.push(event(1)).unwrap();
    throttler.push(event(2)).unwrap();

    let err = throttler.push(event(3)).unwrap_err();
    assert!(matches!(err, ThrottleError::BufferFull { capacity: 2 }));

    sink.release();
    throttler.close().await;
}

#[tokio::test]
async fn test_event_rate_limit() {
    let sink = Arc::new(RecordingSink::default());
    let config = ThrottlerConfig::builder()
        .buffer_size(10)
        .batch_size(5)
        .max_events_per_second(1.0)
        .build()
        .unwrap();
    let throttler = throttler(config, sink.clone());
    throttler.start().unwrap();

    for i in 0..3 {
        throttler.push(event(i)).unwrap();
    }
    assert!(throttler.snapshot().event_rate_limit_failures >= 2);

    throttler.close().await;
    assert_eq!(sink.events(), vec![event(0)]);
    assert!(throttler.snapshot().is_reconciled());
}

#[tokio::test]
async fn test_byte_rate_limit() {
    let sink = Arc::new(RecordingSink::default());
    let config = ThrottlerConfig::builder()
        .buffer_size(10)
        .batch_size(5)
        .max_bytes_per_second(10.0)
        .build()
        .unwrap();
    let throttler = throttler(config, sink.clone()).ignore_exceptions(false);
    throttler.start().unwrap();

    throttler.push(Bytes::from_static(b"12345")).unwrap();
    let err = throttler.push(Bytes::from_static(b"123456")).unwrap_err();
    assert!(matches!(err, ThrottleError::ByteRateLimited { size: 6, .. }));
    throttler.push(Bytes::from_static(b"abcde")).unwrap();
    assert!(throttler.push(Bytes::from_static(b"x")).is_err());

    throttler.close().await;
    assert_eq!(throttler.snapshot().byte_rate_limit_failures, 2);
    assert_eq!(sink.events().len(), 2);
}

#[tokio::test]
async fn test_event_limit_checked_before_byte_limit() {
    let sink = Arc::new(RecordingSink::default());
    let config = ThrottlerConfig::builder()
        .buffer_size(10)
        .batch_size(5)
        .max_events_per_second(1.0)
        .max_bytes_per_second(1.0)
        .build()
        .unwrap();
    let throttler = throttler(config, sink).ignore_exceptions(false);
    throttler.start().unwrap();

    throttler.push(Bytes::from_static(b"a")).unwrap();
    let err = throttler.push(Bytes::from_static(b"b")).unwrap_err();
    assert!(matches!(err, ThrottleError::EventRateLimited { .. }));

    let snapshot = throttler.snapshot();
    assert_eq!(snapshot.event_rate_limit_failures, 1);
    assert_eq!(snapshot.byte_rate_limit_failures, 0);
    throttler.close().await;
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_push_before_start_is_ignored() {
    let sink = Arc::new(RecordingSink::default());
    let permissive = throttler(config(10, 5, Duration::from_secs(1)), sink.clone());
    permissive.push(event(0)).unwrap();
    assert_eq!(permissive.snapshot().total_events, 1);
    assert_eq!(permissive.snapshot().ignored_events, 1);

    let strict = throttler(config(10, 5, Duration::from_secs(1)), sink).ignore_exceptions(false);
    assert!(matches!(
        strict.push(event(0)),
        Err(ThrottleError::NotStarted)
    ));
}

#[tokio::test]
async fn test_push_after_close_is_ignored() {
    let sink = Arc::new(RecordingSink::default());
    let throttler =
        throttler(config(10, 5, Duration::from_secs(1)), sink.clone()).ignore_exceptions(false);
    throttler.start().unwrap();
    throttler.close().await;

    assert!(matches!(throttler.push(event(0)), Err(ThrottleError::Closed)));
    assert_eq!(throttler.snapshot().ignored_events, 1);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_start_twice_and_after_close() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(10, 5, Duration::from_secs(1)), sink);

    throttler.start().unwrap();
    assert!(matches!(throttler.start(), Err(ThrottleError::AlreadyStarted)));

    throttler.close().await;
    throttler.close().await;
    assert!(matches!(throttler.start(), Err(ThrottleError::Closed)));
}

#[test]
fn test_start_outside_runtime() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(10, 5, Duration::from_secs(1)), sink);

    assert!(matches!(throttler.start(), Err(ThrottleError::NoRuntime)));
    assert_eq!(throttler.state(), State::Created);
}

#[tokio::test]
async fn test_close_without_start() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(10, 5, Duration::from_secs(1)), sink);
    throttler.close().await;
    assert_eq!(throttler.state(), State::Closed);
}

#[tokio::test]
async fn test_abort_drops_buffered_events() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(100, 10, Duration::from_secs(60)), sink.clone());
    throttler.start().unwrap();

    for i in 0..5 {
        throttler.push(event(i)).unwrap();
    }
    throttler.abort().await;

    assert!(sink.events().is_empty());
    assert_eq!(throttler.state(), State::Closed);

    let snapshot = throttler.snapshot();
    assert_eq!(snapshot.ignored_events, 5);
    assert!(snapshot.is_reconciled());

    // close after abort is a no-op
    throttler.close().await;
    assert!(sink.events().is_empty());
}

// ============================================================================
// Stats registration
// ============================================================================

#[tokio::test]
async fn test_stats_released_on_close() {
    let registry = SharedStatsRegistry::shared();
    let sink: Arc<dyn Sink> = Arc::new(RecordingSink::default());
    let shared = ThrottlerConfig::builder().stats_name("shared").build().unwrap();

    let first = Throttler::new("a", shared.clone(), sink.clone(), registry.clone()).unwrap();
    let second = Throttler::new("b", shared, sink.clone(), registry.clone()).unwrap();
    assert_eq!(first.stats_name(), "shared");
    assert_eq!(registry.ref_count("shared"), 2);
    assert!(Arc::ptr_eq(first.stats(), second.stats()));

    first.start().unwrap();
    second.start().unwrap();
    first.push(event(0)).unwrap();
    second.push(event(1)).unwrap();

    first.close().await;
    assert_eq!(registry.ref_count("shared"), 1);
    second.close().await;
    assert_eq!(registry.ref_count("shared"), 0);
    assert!(registry.get("shared").is_none());

    assert_eq!(second.snapshot().push_successes, 2);
}

#[tokio::test]
async fn test_stats_name_defaults_to_throttler_name() {
    let registry = SharedStatsRegistry::shared();
    let sink: Arc<dyn Sink> = Arc::new(RecordingSink::default());
    let throttler = Throttler::new(
        "orders",
        config(10, 5, Duration::from_secs(1)),
        sink,
        registry.clone(),
    )
    .unwrap();

    assert_eq!(throttler.stats_name(), "orders");
    assert_eq!(registry.names(), vec!["orders".to_string()]);

    drop(throttler);
    assert!(registry.names().is_empty());
}

// ============================================================================
// Concurrency and reconciliation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_keep_per_producer_order() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = throttler(config(2000, 100, Duration::from_millis(20)), sink.clone());
    throttler.start().unwrap();

    std::thread::scope(|scope| {
        for producer in 0..4 {
            let throttler = &throttler;
            scope.spawn(move || {
                for seq in 0..250 {
                    let event = Bytes::from(format!("{producer}:{seq}"));
                    throttler.push(event).unwrap();
                }
            });
        }
    });
    throttler.close().await;

    let events = sink.events();
    assert_eq!(events.len(), 1000);

    let mut next = [0usize; 4];
    for event in events {
        let text = std::str::from_utf8(&event).unwrap();
        let (producer, seq) = text.split_once(':').unwrap();
        let producer: usize = producer.parse().unwrap();
        let seq: usize = seq.parse().unwrap();
        assert_eq!(seq, next[producer], "producer {producer} out of order");
        next[producer] += 1;
    }
    assert!(throttler.snapshot().is_reconciled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_while_producers_push() {
    let sink = Arc::new(RecordingSink::default());
    let throttler = Arc::new(throttler(
        config(1000, 100, Duration::from_millis(10)),
        sink.clone(),
    ));
    throttler.start().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let throttler = Arc::clone(&throttler);
            std::thread::spawn(move || {
                let mut i = 0;
                while throttler.state() != State::Closed && i < 10_000_000 {
                    throttler.push(event(i)).unwrap();
                    i += 1;
                }
                // keep pushing into the closed throttler
                for _ in 0..10 {
                    throttler.push(event(i)).unwrap();
                    i += 1;
                }
            })
        })
        .collect();

    wait_until(|| throttler.stats().total_events() >= 2000).await;
    throttler.close().await;
    for producer in producers {
        producer.join().unwrap();
    }

    let snapshot = throttler.snapshot();
    assert!(snapshot.is_reconciled(), "{snapshot:?}");
    assert!(snapshot.ignored_events >= 40);
    assert_eq!(snapshot.push_successes, sink.events().len() as u64);
    assert_eq!(throttler.buffered(), 0);
}

#[tokio::test]
async fn test_counters_reconcile_at_quiescence() {
    let sink = Arc::new(FailingSink::new(2));
    let config = ThrottlerConfig::builder()
        .buffer_size(20)
        .batch_size(4)
        .flush_period(Duration::from_millis(20))
        .max_events_per_second(30.0)
        .build()
        .unwrap();
    let throttler = throttler(config, sink.clone());

    throttler.push(event(0)).unwrap();
    throttler.start().unwrap();

    for round in 0..5 {
        for i in 0..10 {
            throttler.push(event(round * 10 + i)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    throttler.close().await;
    throttler.push(event(99)).unwrap();

    let snapshot = throttler.snapshot();
    assert_eq!(snapshot.total_events, 52);
    assert!(snapshot.event_rate_limit_failures > 0);
    assert!(snapshot.push_failures > 0);
    assert!(snapshot.is_reconciled(), "{snapshot:?}");
}
