//! Redlog - Redis log appender toolkit
//!
//! # Usage
//!
//! ```bash
//! # Validate a configuration file
//! redlog check --config redlog.toml
//!
//! # Push 100 test events through every configured appender
//! redlog send --count 100 --message "hello"
//!
//! # Same, without a Redis server
//! redlog send --count 100 --null
//! ```

mod cmd;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Redlog - throttled, batched log shipping to Redis
#[derive(Parser, Debug)]
#[command(name = "redlog")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "redlog.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the configuration file
    Check(cmd::check::CheckArgs),

    /// Send test events through the configured appenders
    Send(cmd::send::SendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Check doesn't need logging - just outputs to stdout
        Command::Check(args) => cmd::check::run(&cli.config, args),
        Command::Send(args) => cmd::send::run(&cli.config, cli.log_level.as_deref(), args).await,
    }
}
