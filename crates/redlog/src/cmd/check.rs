//! Check command - load and validate a configuration file
//!
//! # Usage
//!
//! ```bash
//! redlog check --config redlog.toml
//! redlog check --quiet && echo valid
//! ```

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use humantime_serde::re::humantime::format_duration;
use redlog_config::{AppenderConfig, Config, LayoutKind};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Quiet mode - only report errors
    #[arg(short, long)]
    quiet: bool,
}

pub fn run(config_path: &Path, args: CheckArgs) -> Result<()> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;

    if !args.quiet {
        print!("{}", render_summary(&config));
    }
    Ok(())
}

fn render_summary(config: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "configuration ok: {} appender(s), log level {}, stats every {}",
        config.appenders.len(),
        config.log.level.as_str(),
        match config.metrics.report_interval() {
            Some(interval) => format_duration(interval).to_string(),
            None => "never".to_string(),
        }
    );
    for appender in &config.appenders {
        render_appender(&mut out, appender);
    }
    out
}

fn render_appender(out: &mut String, appender: &AppenderConfig) {
    let redis = &appender.redis;
    let throttler = &appender.throttler;
    let layout = match appender.layout {
        LayoutKind::Json => "json",
        LayoutKind::Plain => "plain",
    };

    let _ = writeln!(out, "  {}", appender.name);
    let _ = writeln!(
        out,
        "    redis:     {} db {} key \"{}\"{}",
        redis.address(),
        redis.database,
        redis.key_str(),
        if redis.password.is_some() { " (auth)" } else { "" }
    );
    let _ = writeln!(
        out,
        "    layout:    {}, ignore_exceptions: {}",
        layout, appender.ignore_exceptions
    );
    let _ = writeln!(
        out,
        "    throttler: buffer {}, batch {}, flush {}",
        throttler.buffer_size(),
        throttler.batch_size(),
        format_duration(throttler.flush_period())
    );
    let _ = writeln!(
        out,
        "    limits:    events/s {}, bytes/s {}, errors/s {}",
        rate(throttler.max_events_per_second()),
        rate(throttler.max_bytes_per_second()),
        rate(throttler.max_errors_per_second())
    );
    let _ = writeln!(out, "    stats:     {}", appender.stats_name());
}

fn rate(value: f64) -> String {
    if value == 0.0 {
        "unlimited".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[metrics]
interval = "30s"

[[appenders]]
name = "orders"
layout = "plain"

[appenders.redis]
host = "redis.internal"
key = "orders-logs"
password = "secret"

[appenders.throttler]
buffer_size = 200
batch_size = 50
flush_period = "250ms"
max_events_per_second = 2.5
"#;

    #[test]
    fn test_render_summary() {
        let config: Config = CONFIG.parse().unwrap();
        let summary = render_summary(&config);

        assert!(summary.starts_with("configuration ok: 1 appender(s), log level info, stats every 30s"));
        assert!(summary.contains("redis:     redis.internal:6379 db 0 key \"orders-logs\" (auth)"));
        assert!(summary.contains("layout:    plain, ignore_exceptions: true"));
        assert!(summary.contains("throttler: buffer 200, batch 50, flush 250ms"));
        assert!(summary.contains("limits:    events/s 2.5, bytes/s unlimited, errors/s unlimited"));
        assert!(summary.contains("stats:     orders/throttler"));
    }

    #[test]
    fn test_run_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        run(file.path(), CheckArgs { quiet: true }).unwrap();
    }

    #[test]
    fn test_run_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[[appenders]]\nname = \"\"\n").unwrap();

        let err = run(file.path(), CheckArgs { quiet: true }).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }
}
