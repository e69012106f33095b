//! Trackplay Core - Telemetry ingestion for deterministic trajectory playback
//!
//! This crate turns recorded antenna telemetry into time-ordered samples with
//! virtual-time offsets: register values, resource access, telemetry formats,
//! plan configuration and tracing setup.

pub mod config;
pub mod resources;
pub mod telemetry;
pub mod tracing_setup;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

// Re-export main types for convenient access
pub use config::{ChannelBinding, ConfigError, PlanConfig, StationConfig, TrackplayConfig};
pub use resources::{FileResources, InMemoryResources, ResourceError, ResourceOpener};
pub use telemetry::{
    Channel, ClockResolution, DurationResolver, ResolvedSample, Sample, SampleTime,
    TelemetryError, TelemetryFormat, TimeSeriesLoader, load_resolved,
};
pub use value::{RegisterValue, ValueKind};

/// Core errors that can bubble up from any Trackplay subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TrackplayError {
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackplayError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TrackplayError::Telemetry(e) => e.user_message(),
            TrackplayError::Resource(e) => e.user_message(),
            TrackplayError::Config(e) => e.user_message(),
            TrackplayError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TrackplayError::Telemetry(TelemetryError::MalformedRecord { .. })
                | TrackplayError::Telemetry(TelemetryError::BeforeEpoch { .. })
                | TrackplayError::Resource(ResourceError::NotFound { .. })
                | TrackplayError::Config(ConfigError::Invalid { .. })
                | TrackplayError::Config(ConfigError::Parse(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackplayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_is_user_error() {
        let error: TrackplayError = TelemetryError::MalformedRecord {
            line: 3,
            reason: "expected 3 fields".to_string(),
        }
        .into();

        assert!(error.is_user_error());
        assert_eq!(
            error.user_message(),
            "Telemetry line 3 is malformed: expected 3 fields"
        );
    }

    #[test]
    fn test_io_error_is_not_user_error() {
        let error: TrackplayError = std::io::Error::other("disk gone").into();

        assert!(!error.is_user_error());
        assert_eq!(error.user_message(), "File system error occurred");
    }

    #[test]
    fn test_missing_resource_message() {
        let error: TrackplayError = ResourceError::NotFound {
            id: "/az_el_DSS-13.txt".to_string(),
        }
        .into();

        assert_eq!(
            error.user_message(),
            "Telemetry resource /az_el_DSS-13.txt not found"
        );
    }

    #[test]
    fn test_invalid_plan_message() {
        let error: TrackplayError = ConfigError::Invalid {
            reason: "plan has no stations".to_string(),
        }
        .into();

        assert!(error.is_user_error());
        assert_eq!(error.user_message(), "Invalid plan: plan has no stations");
    }
}
