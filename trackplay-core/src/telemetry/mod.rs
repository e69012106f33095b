//! Telemetry time-series ingestion.
//!
//! Parses line-oriented telemetry into time-ordered samples and resolves each
//! sample's time field into a virtual-time offset from the plan epoch. Loading
//! is all-or-nothing: partial telemetry is meaningless for trajectory playback,
//! so the first bad record aborts the whole file.

pub mod loader;
pub mod resolver;
pub mod station_allocation;
pub mod types;
pub mod view_period;

pub use loader::{TimeSeriesLoader, load_resolved};
pub use resolver::{ClockResolution, DurationResolver};
pub use station_allocation::{
    STATION_ALLOCATION_TEXT_FIELDS, STATION_ALLOCATION_TIME_FIELDS, StationAllocationHeader,
};
pub use types::{Channel, ResolvedSample, Sample, SampleTime, TelemetryFormat};
pub use view_period::{VIEW_PERIOD_FIELDS, ViewPeriodHeader};

/// Errors that occur while loading or resolving telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A record failed token parsing or carried too few fields
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A record resolved to a point before the plan epoch
    #[error("Record on line {line} resolves before the plan epoch ({detail})")]
    BeforeEpoch { line: usize, detail: String },

    #[error("Failed to read telemetry after line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl TelemetryError {
    /// Returns the input line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            TelemetryError::MalformedRecord { line, .. }
            | TelemetryError::BeforeEpoch { line, .. }
            | TelemetryError::Io { line, .. } => *line,
        }
    }

    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TelemetryError::MalformedRecord { line, reason } => {
                format!("Telemetry line {line} is malformed: {reason}")
            }
            TelemetryError::BeforeEpoch { line, .. } => {
                format!("Telemetry line {line} lies before the plan epoch")
            }
            TelemetryError::Io { line, .. } => {
                format!("Telemetry could not be read past line {line}")
            }
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TelemetryError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}
