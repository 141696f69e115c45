//! Periodic stats reporter
//!
//! Logs the counters of every registered throttler at the configured
//! interval until cancelled.

use std::sync::Arc;

use redlog_config::MetricsConfig;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::StatsRegistry;
use crate::format::{StatsFormatter, formatter_for};

/// Reports every name in a registry
pub struct StatsReporter {
    registry: Arc<dyn StatsRegistry>,
    formatter: Box<dyn StatsFormatter>,
    interval: Option<Duration>,
}

impl StatsReporter {
    /// Create a reporter for `registry` using the metrics settings
    pub fn new(registry: Arc<dyn StatsRegistry>, config: &MetricsConfig) -> Self {
        Self {
            registry,
            formatter: formatter_for(config.format),
            interval: config.report_interval(),
        }
    }

    /// Run the reporter until cancellation
    pub async fn run(self, cancel: CancellationToken) {
        let Some(period) = self.interval else {
            return;
        };

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately
        ticker.tick().await;

        info!(
            interval_secs = period.as_secs(),
            "stats reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    for line in self.render() {
                        info!("{}", line);
                    }
                }
            }
        }
    }

    /// Format the current counters of every registered throttler
    pub fn render(&self) -> Vec<String> {
        let interval_secs = self.interval.map_or(0, |period| period.as_secs());

        self.registry
            .names()
            .into_iter()
            .filter_map(|name| {
                let stats = self.registry.get(&name)?;
                Some(
                    self.formatter
                        .format_stats(&name, &stats.snapshot(), interval_secs),
                )
            })
            .collect()
    }
}

/// Spawn a reporter task for `registry`
pub fn spawn_stats_reporter(
    registry: Arc<dyn StatsRegistry>,
    config: &MetricsConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let reporter = StatsReporter::new(registry, config);
    tokio::spawn(async move {
        reporter.run(cancel).await;
    })
}
