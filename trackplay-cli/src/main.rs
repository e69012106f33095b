//! Trackplay CLI - Command-line interface
//!
//! Builds plans from JSON, runs them on the virtual clock, replays checkpoints
//! and inspects telemetry files.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use trackplay_core::TrackplayConfig;
use trackplay_core::tracing_setup::{CliLogLevel, init_console_tracing, init_tracing};

#[derive(Parser)]
#[command(name = "trackplay")]
#[command(about = "Deterministic playback of recorded antenna telemetry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the full trace log (defaults to TRACKPLAY_LOGS_DIR or ./logs)
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = TrackplayConfig::from_env();
    let level = cli.log_level.as_tracing_level();

    if cli.command.writes_trace_log() {
        let logs_dir = cli.logs_dir.as_deref().unwrap_or(&config.logs_dir);
        init_tracing(level, Some(logs_dir))
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    } else {
        init_console_tracing(level)
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    }

    commands::handle_command(cli.command, &config).map_err(commands::user_facing)
}
