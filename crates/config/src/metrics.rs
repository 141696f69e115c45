//! `[metrics]` section: periodic dumps of throttler counters
//!
//! While appenders run, the counters of every registered throttler name are
//! logged each `interval`. Set `enabled = false` or `interval = "0s"` to
//! keep only the summary that `redlog send` prints on exit.

use std::time::Duration;

use serde::Deserialize;

/// How counter dumps are rendered
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// One aligned line per throttler
    #[default]
    Human,
    /// One JSON object per throttler
    Json,
}

/// Counter reporting settings
///
/// ```toml
/// [metrics]
/// interval = "30s"
/// format = "json"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,

    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    pub format: MetricsFormat,
}

impl MetricsConfig {
    /// Period between dumps, `None` when reporting is off
    pub fn report_interval(&self) -> Option<Duration> {
        (self.enabled && !self.interval.is_zero()).then_some(self.interval)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            format: MetricsFormat::Human,
        }
    }
}
