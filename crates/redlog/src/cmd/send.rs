//! Send command - push test events through the configured appenders
//!
//! Events are emitted as `tracing` events with target `send`, so they take
//! the same path as application logs: subscriber, `RedisLayer`, layout,
//! throttler, sink. Appenders are stopped (final flush) before the stats
//! are printed.
//!
//! # Usage
//!
//! ```bash
//! # 10 events through every appender in redlog.toml
//! redlog send
//!
//! # 1000 events, one per millisecond, without a Redis server
//! redlog send --count 1000 --interval 1ms --null
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use humantime_serde::re::humantime;
use redlog_appender::{RedisAppender, RedisLayer};
use redlog_config::{AppenderConfig, Config};
use redlog_metrics::format::formatter_for;
use redlog_metrics::{SharedStatsRegistry, StatsRegistry, spawn_stats_reporter};
use redlog_sinks::null::NullSink;
use redlog_sinks::redis::RedisSink;
use redlog_sinks::{Sink, SinkMetricsHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::logging::{init_logging, resolve_log_level};

/// Target of the emitted test events
const EVENT_TARGET: &str = "send";

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Number of events to send
    #[arg(short = 'n', long, default_value = "10")]
    pub(crate) count: usize,

    /// Event message (emitted at info level)
    #[arg(short, long, default_value = "redlog test event")]
    pub(crate) message: String,

    /// Pause between events, e.g. "10ms"
    #[arg(short, long, value_parser = parse_duration)]
    pub(crate) interval: Option<Duration>,

    /// Discard batches instead of writing to Redis
    #[arg(long)]
    pub(crate) null: bool,

    /// Only use the appender with this name
    #[arg(short, long)]
    pub(crate) appender: Option<String>,
}

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// An appender plus the metrics of the sink it owns
struct Target {
    appender: Arc<RedisAppender>,
    sink_metrics: SinkMetricsHandle,
}

pub async fn run(config_path: &Path, log_level: Option<&str>, args: SendArgs) -> Result<()> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;

    let selected = select_appenders(&config, args.appender.as_deref())?;
    let registry = SharedStatsRegistry::shared();
    let targets = selected
        .into_iter()
        .map(|appender| build_target(appender, args.null, Arc::clone(&registry)))
        .collect::<Result<Vec<_>>>()?;

    let layers = targets
        .iter()
        .map(|t| RedisLayer::new(Arc::clone(&t.appender)))
        .collect();
    init_logging(resolve_log_level(log_level, &config.log), &config.log, layers)?;

    for target in &targets {
        target.appender.start()?;
    }

    let cancel = CancellationToken::new();
    let reporter = spawn_stats_reporter(Arc::clone(&registry), &config.metrics, cancel.clone());

    let started = Instant::now();
    for seq in 0..args.count {
        info!(target: EVENT_TARGET, seq, "{}", args.message);
        if let Some(interval) = args.interval {
            tokio::time::sleep(interval).await;
        }
    }

    for target in &targets {
        target.appender.stop().await;
    }
    cancel.cancel();
    if let Err(e) = reporter.await {
        warn!(error = %e, "stats reporter terminated abnormally");
    }

    let formatter = formatter_for(config.metrics.format);
    let elapsed = started.elapsed().as_secs();
    for target in &targets {
        let appender = &target.appender;
        println!(
            "{}",
            formatter.format_stats(appender.throttler().stats_name(), &appender.stats(), elapsed)
        );
        println!(
            "{}",
            formatter.format_sink(target.sink_metrics.name(), &target.sink_metrics.snapshot())
        );
    }

    Ok(())
}

fn select_appenders(config: &Config, only: Option<&str>) -> Result<Vec<AppenderConfig>> {
    let selected: Vec<AppenderConfig> = match only {
        Some(name) => match config.appender(name) {
            Some(appender) => vec![appender.clone()],
            None => bail!(
                "no appender named '{}' (configured: {})",
                name,
                config.appender_names().join(", ")
            ),
        },
        None => config.appenders.clone(),
    };

    if selected.is_empty() {
        bail!("no appenders configured");
    }
    Ok(selected)
}

fn build_target(
    config: AppenderConfig,
    null: bool,
    registry: Arc<dyn StatsRegistry>,
) -> Result<Target> {
    let (sink, sink_metrics): (Arc<dyn Sink>, SinkMetricsHandle) = if null {
        let sink = Arc::new(NullSink::with_name(config.name.clone()));
        let metrics = sink.metrics_handle();
        (sink as Arc<dyn Sink>, metrics)
    } else {
        let sink = Arc::new(RedisSink::new(config.name.clone(), config.redis.clone()));
        let metrics = sink.metrics_handle();
        (sink as Arc<dyn Sink>, metrics)
    };

    let name = config.name.clone();
    let appender = RedisAppender::with_sink(config, sink, registry)
        .with_context(|| format!("failed to build appender '{name}'"))?;

    Ok(Target {
        appender: Arc::new(appender),
        sink_metrics,
    })
}
