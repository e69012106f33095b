//! Centralized configuration for Trackplay.
//!
//! Runtime settings live in [`TrackplayConfig`] (defaults plus environment
//! overrides). The model a simulation is built from lives in [`PlanConfig`],
//! which is read from JSON and replaces any form of annotation-driven
//! registration: every station, channel and register is spelled out.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::{Channel, ClockResolution, TelemetryFormat};
use crate::value::ValueKind;

/// Errors raised while reading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read plan file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plan: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid plan: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Invalid { reason } => format!("Invalid plan: {reason}"),
            ConfigError::Parse(e) => format!("Plan file is not valid JSON: {e}"),
            ConfigError::Io { path, .. } => {
                format!("Plan file {} could not be read", path.display())
            }
        }
    }
}

/// Runtime settings shared by all Trackplay components.
#[derive(Debug, Clone)]
pub struct TrackplayConfig {
    /// Directory that resource identifiers are resolved against
    pub resource_root: PathBuf,
    /// Overrides the plan epoch when set
    pub plan_epoch: Option<DateTime<Utc>>,
    /// Overrides the plan clock resolution when set
    pub resolution: Option<ClockResolution>,
    /// Directory for the full debug log
    pub logs_dir: PathBuf,
}

impl Default for TrackplayConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("."),
            plan_epoch: None,
            resolution: None,
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl TrackplayConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored with a warning and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("TRACKPLAY_RESOURCE_ROOT") {
            config.resource_root = PathBuf::from(root);
        }

        if let Ok(epoch) = std::env::var("TRACKPLAY_PLAN_EPOCH") {
            match DateTime::parse_from_rfc3339(&epoch) {
                Ok(parsed) => config.plan_epoch = Some(parsed.with_timezone(&Utc)),
                Err(e) => tracing::warn!("Ignoring TRACKPLAY_PLAN_EPOCH={epoch}: {e}"),
            }
        }

        if let Ok(resolution) = std::env::var("TRACKPLAY_CLOCK_RESOLUTION") {
            match resolution.parse::<ClockResolution>() {
                Ok(parsed) => config.resolution = Some(parsed),
                Err(e) => tracing::warn!("Ignoring TRACKPLAY_CLOCK_RESOLUTION: {e}"),
            }
        }

        if let Ok(logs_dir) = std::env::var("TRACKPLAY_LOGS_DIR") {
            config.logs_dir = PathBuf::from(logs_dir);
        }

        config
    }

    /// Applies the overrides held by this configuration to `plan`.
    pub fn apply_overrides(&self, plan: &mut PlanConfig) {
        if let Some(epoch) = self.plan_epoch {
            plan.epoch = epoch;
        }
        if let Some(resolution) = self.resolution {
            plan.resolution = resolution;
        }
    }
}

/// Binds one telemetry channel to a named register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBinding {
    /// Channel (column) name in the telemetry input
    pub channel: String,
    /// Stable register name exposed to external queriers
    pub register: String,
    #[serde(default = "default_kind")]
    pub kind: ValueKind,
}

fn default_kind() -> ValueKind {
    ValueKind::Real
}

impl ChannelBinding {
    pub fn real(channel: &str, register: &str) -> Self {
        Self {
            channel: channel.to_string(),
            register: register.to_string(),
            kind: ValueKind::Real,
        }
    }

    pub fn text(channel: &str, register: &str) -> Self {
        Self {
            channel: channel.to_string(),
            register: register.to_string(),
            kind: ValueKind::Text,
        }
    }

    /// Returns the channel declaration the loader parses against.
    pub fn as_channel(&self) -> Channel {
        Channel::new(&self.channel, self.kind)
    }
}

/// One telemetry source driving a group of registers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station label used in logs and reports
    pub name: String,
    /// Logical resource identifier of the telemetry input
    pub resource: String,
    pub format: TelemetryFormat,
    /// Channel bindings in payload order
    pub channels: Vec<ChannelBinding>,
}

/// Complete description of a simulation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Zero point of virtual time
    pub epoch: DateTime<Utc>,
    #[serde(default)]
    pub resolution: ClockResolution,
    /// Root for resource identifiers; falls back to the runtime setting
    #[serde(default)]
    pub resource_root: Option<PathBuf>,
    pub stations: Vec<StationConfig>,
}

impl PlanConfig {
    /// Parses and validates a plan from JSON text.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Parse` - Text is not a valid plan document
    /// - `ConfigError::Invalid` - Plan fails validation
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let plan: PlanConfig = serde_json::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reads, parses and validates a plan file.
    ///
    /// A relative `resource_root` in the file is resolved against the
    /// directory containing the plan.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Io` - File could not be read
    /// - `ConfigError::Parse` - File is not a valid plan document
    /// - `ConfigError::Invalid` - Plan fails validation
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut plan = Self::from_json_str(&text)?;

        if let (Some(root), Some(parent)) = (plan.resource_root.as_ref(), path.parent()) {
            if root.is_relative() {
                plan.resource_root = Some(parent.join(root));
            }
        }

        Ok(plan)
    }

    /// Checks structural constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Invalid` - Describes the first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stations.is_empty() {
            return Err(invalid("plan declares no stations"));
        }

        let mut registers = HashSet::new();
        for station in &self.stations {
            if station.channels.is_empty() {
                return Err(invalid(format!(
                    "station {} binds no channels",
                    station.name
                )));
            }

            if let TelemetryFormat::Cadence { interval_secs } = station.format {
                if !interval_secs.is_finite() || interval_secs <= 0.0 {
                    return Err(invalid(format!(
                        "station {} has non-positive cadence interval {interval_secs}",
                        station.name
                    )));
                }
            }

            for binding in &station.channels {
                if !registers.insert(binding.register.as_str()) {
                    return Err(invalid(format!(
                        "register {} is bound more than once",
                        binding.register
                    )));
                }
            }
        }

        Ok(())
    }

    /// Plan for the DSS-13 azimuth/elevation track.
    pub fn dss13_default(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            resolution: ClockResolution::Seconds,
            resource_root: None,
            stations: vec![StationConfig {
                name: "DSS-13".to_string(),
                resource: "/az_el_DSS-13.txt".to_string(),
                format: TelemetryFormat::ElapsedDelta,
                channels: vec![
                    ChannelBinding::real("azimuth", "/DSS_13_Azimuth"),
                    ChannelBinding::real("elevation", "/DSS_13_Elevation"),
                ],
            }],
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}
