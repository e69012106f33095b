//! Conversion of sample time fields into virtual-time offsets.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TelemetryError;
use super::types::{ResolvedSample, Sample, SampleTime};

/// Smallest unit of the host's virtual clock.
///
/// Offsets finer than the unit are truncated toward zero, never rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    #[default]
    Seconds,
    Microseconds,
}

impl ClockResolution {
    /// Truncates `duration` to a whole number of clock units.
    pub fn truncate(self, duration: Duration) -> Duration {
        match self {
            ClockResolution::Seconds => Duration::from_secs(duration.as_secs()),
            ClockResolution::Microseconds => {
                Duration::new(duration.as_secs(), duration.subsec_micros() * 1_000)
            }
        }
    }
}

impl FromStr for ClockResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seconds" | "s" => Ok(ClockResolution::Seconds),
            "microseconds" | "us" => Ok(ClockResolution::Microseconds),
            _ => Err(format!("Invalid clock resolution: {s}")),
        }
    }
}

impl fmt::Display for ClockResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockResolution::Seconds => write!(f, "seconds"),
            ClockResolution::Microseconds => write!(f, "microseconds"),
        }
    }
}

/// Maps sample time fields onto offsets from a plan epoch.
#[derive(Debug, Clone, Copy)]
pub struct DurationResolver {
    epoch: DateTime<Utc>,
    resolution: ClockResolution,
}

impl DurationResolver {
    pub fn new(epoch: DateTime<Utc>, resolution: ClockResolution) -> Self {
        Self { epoch, resolution }
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn resolution(&self) -> ClockResolution {
        self.resolution
    }

    /// Resolves a time field read from input line `line`.
    ///
    /// # Errors
    ///
    /// - `TelemetryError::BeforeEpoch` - Elapsed seconds are negative or the timestamp precedes the epoch
    /// - `TelemetryError::MalformedRecord` - Elapsed seconds are not finite
    pub fn resolve(&self, time: &SampleTime, line: usize) -> Result<Duration, TelemetryError> {
        let exact = match *time {
            SampleTime::Elapsed(seconds) => {
                if !seconds.is_finite() {
                    return Err(TelemetryError::malformed(
                        line,
                        format!("elapsed time {seconds} is not finite"),
                    ));
                }
                if seconds < 0.0 {
                    return Err(TelemetryError::BeforeEpoch {
                        line,
                        detail: format!("elapsed {seconds}s"),
                    });
                }
                // try_from_secs_f64 only fails on overflow here
                Duration::try_from_secs_f64(seconds).map_err(|e| {
                    TelemetryError::malformed(line, format!("elapsed time {seconds}s: {e}"))
                })?
            }
            SampleTime::Absolute(timestamp) => (timestamp - self.epoch).to_std().map_err(|_| {
                TelemetryError::BeforeEpoch {
                    line,
                    detail: format!("{} precedes epoch {}", timestamp, self.epoch),
                }
            })?,
        };

        Ok(self.resolution.truncate(exact))
    }

    /// Resolves a whole sample, keeping its payload and position.
    ///
    /// # Errors
    ///
    /// Same as [`DurationResolver::resolve`].
    pub fn resolve_sample(&self, sample: Sample) -> Result<ResolvedSample, TelemetryError> {
        let offset = self.resolve(&sample.time, sample.line)?;
        Ok(ResolvedSample {
            line: sample.line,
            sequence: sample.sequence,
            offset,
            payload: sample.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 8, 18, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_elapsed_truncates_to_seconds() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Seconds);

        let offset = resolver.resolve(&SampleTime::Elapsed(35.999), 1).unwrap();
        assert_eq!(offset, Duration::from_secs(35));
    }

    #[test]
    fn test_elapsed_truncates_to_microseconds() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Microseconds);

        let offset = resolver.resolve(&SampleTime::Elapsed(1.5), 1).unwrap();
        assert_eq!(offset, Duration::from_micros(1_500_000));
    }

    #[test]
    fn test_negative_elapsed_is_before_epoch() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Seconds);

        let result = resolver.resolve(&SampleTime::Elapsed(-1.0), 4);
        assert!(matches!(result, Err(TelemetryError::BeforeEpoch { line: 4, .. })));
    }

    #[test]
    fn test_absolute_timestamp_offset() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Seconds);
        let timestamp = epoch() + chrono::Duration::milliseconds(3_600_750);

        let offset = resolver
            .resolve(&SampleTime::Absolute(timestamp), 2)
            .unwrap();
        assert_eq!(offset, Duration::from_secs(3600));
    }

    #[test]
    fn test_absolute_before_epoch_fails() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Seconds);
        let timestamp = epoch() - chrono::Duration::seconds(1);

        let result = resolver.resolve(&SampleTime::Absolute(timestamp), 7);
        assert!(matches!(result, Err(TelemetryError::BeforeEpoch { line: 7, .. })));
    }

    #[test]
    fn test_absolute_at_epoch_is_zero() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Microseconds);

        let offset = resolver.resolve(&SampleTime::Absolute(epoch()), 1).unwrap();
        assert_eq!(offset, Duration::ZERO);
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!(
            "Seconds".parse::<ClockResolution>().unwrap(),
            ClockResolution::Seconds
        );
        assert_eq!(
            "us".parse::<ClockResolution>().unwrap(),
            ClockResolution::Microseconds
        );
        assert!("hours".parse::<ClockResolution>().is_err());
    }
}
