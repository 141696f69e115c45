//! Tracing subscriber setup

use anyhow::{Result, anyhow};
use redlog_appender::RedisLayer;
use redlog_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Resolve log level: CLI flag > config file
pub fn resolve_log_level<'a>(cli_level: Option<&'a str>, config: &LogConfig) -> &'a str {
    cli_level.unwrap_or(config.level.as_str())
}

/// Install the global subscriber: console or JSON output plus one layer per
/// Redis appender
pub fn init_logging(level: &str, config: &LogConfig, redis_layers: Vec<RedisLayer>) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(output_layer(config))
        .with(redis_layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {}", e))?;

    Ok(())
}

fn output_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(true).with_thread_ids(false);
    match (config.format, config.output) {
        (LogFormat::Console, LogOutput::Stderr) => layer.with_writer(std::io::stderr).boxed(),
        (LogFormat::Console, LogOutput::Stdout) => layer.with_writer(std::io::stdout).boxed(),
        (LogFormat::Json, LogOutput::Stderr) => layer.json().with_writer(std::io::stderr).boxed(),
        (LogFormat::Json, LogOutput::Stdout) => layer.json().with_writer(std::io::stdout).boxed(),
    }
}
