//! Tracing setup for Trackplay
//!
//! Console output goes to stderr at a user-chosen level; stdout is reserved for
//! command results. Commands that build a plan also keep a per-run trace log,
//! so a rejected telemetry file can be diagnosed record by record afterwards.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run trace log.
pub const LOG_FILE_NAME: &str = "trackplay-last-run.log";

/// Directives for the trace log: every Trackplay crate at TRACE, dependencies at WARN.
const TRACE_LOG_DIRECTIVES: &str = "warn,trackplay_core=trace,trackplay_sim=trace,trackplay=trace";

/// Installs the console layer plus a trace log under `logs_dir` (default `./logs`).
///
/// The log is truncated on every run. Returns its path.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - Logs directory or log file could not be created, or a subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let logs_dir = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_dir)?;
    let trace_log = logs_dir.join(LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(File::create(&trace_log)?)
        .with_filter(EnvFilter::new(TRACE_LOG_DIRECTIVES));

    tracing_subscriber::registry()
        .with(console_layer(console_level))
        .with(file_layer)
        .try_init()?;

    tracing::debug!("Trace log at {}", trace_log.display());
    Ok(trace_log)
}

/// Installs only the console layer, for commands that must not touch the disk.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - A global subscriber is already installed
pub fn init_console_tracing(console_level: Level) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(console_layer(console_level))
        .try_init()?;
    Ok(())
}

// RUST_LOG wins over --log-level
fn console_layer<S>(console_level: Level) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.as_str()));

    fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

/// Console verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    /// Includes one line per parsed record and fired effect
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use trackplay_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Info.as_tracing_level(), tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum;

    use super::*;

    #[test]
    fn test_log_level_parses_from_flag_value() {
        assert_eq!(
            CliLogLevel::from_str("debug", true).unwrap(),
            CliLogLevel::Debug
        );
        assert!(CliLogLevel::from_str("verbose", true).is_err());
    }

    #[test]
    fn test_log_level_maps_to_tracing() {
        assert_eq!(CliLogLevel::Warn.as_tracing_level(), Level::WARN);
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
    }

    #[test]
    fn test_trace_log_directives_parse() {
        assert!(TRACE_LOG_DIRECTIVES.parse::<EnvFilter>().is_ok());
    }
}
