//! Sample and format types shared by the loader and resolver.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{RegisterValue, ValueKind};

/// Record layout of a telemetry input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryFormat {
    /// `<delta-seconds> <value_1> [value_2 ...]`, deltas summed into a running total
    ElapsedDelta,
    /// `<value_1> [value_2 ...]`, record `i` (1-based) stamped `i * interval_secs`
    Cadence { interval_secs: f64 },
    /// Tab-separated header plus rows of `<ISO-8601 timestamp>\t<fields...>`
    Tabular,
    /// Legacy fixed-width DSN view-period prediction product
    ViewPeriod,
    /// DSN station allocation file, one record per antenna booking stamped at its start of activity
    StationAllocation,
}

impl TelemetryFormat {
    /// Short name used in logs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryFormat::ElapsedDelta => "elapsed_delta",
            TelemetryFormat::Cadence { .. } => "cadence",
            TelemetryFormat::Tabular => "tabular",
            TelemetryFormat::ViewPeriod => "view_period",
            TelemetryFormat::StationAllocation => "station_allocation",
        }
    }
}

/// Declared output channel of a telemetry input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub kind: ValueKind,
}

impl Channel {
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }

    pub fn real(name: &str) -> Self {
        Self::new(name, ValueKind::Real)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, ValueKind::Text)
    }
}

/// Time field of a sample before resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleTime {
    /// Cumulative elapsed seconds since the plan epoch
    Elapsed(f64),
    /// Absolute timestamp
    Absolute(DateTime<Utc>),
}

/// One parsed telemetry record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// 1-based input line the record came from
    pub line: usize,
    /// 0-based position among the records of the input
    pub sequence: usize,
    pub time: SampleTime,
    /// Values in declared channel order
    pub payload: Vec<RegisterValue>,
}

/// A sample whose time field has been resolved against the plan epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSample {
    pub line: usize,
    pub sequence: usize,
    /// Offset from the plan epoch, truncated to the clock resolution
    pub offset: Duration,
    pub payload: Vec<RegisterValue>,
}
