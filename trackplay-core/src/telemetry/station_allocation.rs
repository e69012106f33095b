//! DSN station allocation file.
//!
//! Shares the 11-line header layout of the view-period product. Each record
//! books one antenna for one activity:
//!
//! ```text
//! CYY DDD SOA  BOT  EOT  EOA  ANTENNA PROJ  DESCRIPTION      PASS CONFIGS WRK R
//! ```
//!
//! SOA, BOT, EOT and EOA are `HHMM` times on the record's day of year. End of
//! track and end of activity roll over into the next day when they fall before
//! the start of activity.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use super::TelemetryError;
use super::view_period::{header_entries, header_entry, header_time};

const DAY_FORMAT: &str = "%y %j";
const CLOCK_FORMAT: &str = "%H%M";

/// Text fields a station allocation record exposes to channel bindings.
pub const STATION_ALLOCATION_TEXT_FIELDS: &[&str] = &[
    "change_indicator",
    "antenna",
    "project",
    "description",
    "pass",
    "config_code",
    "soe_flag",
    "work_code_category",
    "relate",
];

/// Time fields a station allocation record exposes to channel bindings.
///
/// Real channels receive seconds since the start of activity; text channels
/// receive an RFC 3339 timestamp.
pub const STATION_ALLOCATION_TIME_FIELDS: &[&str] = &["soa", "bot", "eot", "eoa"];

static ALLOCATION_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<change_indicator>.)(?P<day>.{6}).(?P<soa>.{4}).(?P<bot>.{4}).(?P<eot>.{4}).(?P<eoa>.{4}).(?P<antenna>.{6}).(?P<project>.{5}).(?P<description>.{16}).(?P<pass>.{4}).(?P<config_code>.{6})(?P<soe_flag>.).(?P<work_code_category>.{3}).(?P<relate>.)",
    )
    .expect("station allocation record pattern should compile")
});

/// Parsed station allocation header.
#[derive(Debug, Clone, PartialEq)]
pub struct StationAllocationHeader {
    pub spacecraft_number: u32,
    pub product_version_id: f64,
    pub applicable_start: DateTime<Utc>,
    pub applicable_stop: DateTime<Utc>,
    pub product_creation: DateTime<Utc>,
    pub entries: BTreeMap<String, String>,
}

impl StationAllocationHeader {
    /// Parses the header from its 11 lines.
    ///
    /// # Errors
    ///
    /// - `TelemetryError::MalformedRecord` - Wrong line count, missing key or unparseable value
    pub fn parse(lines: &[String]) -> Result<Self, TelemetryError> {
        let entries = header_entries(lines, "station allocation")?;

        let spacecraft_raw = header_entry(&entries, "DSN_SPACECRAFT_NUM")?;
        let spacecraft_number: u32 = spacecraft_raw.parse().map_err(|_| {
            TelemetryError::malformed(1, format!("DSN_SPACECRAFT_NUM '{spacecraft_raw}'"))
        })?;
        let version_raw = header_entry(&entries, "PRODUCT_VERSION_ID")?;
        let product_version_id: f64 = version_raw.parse().map_err(|_| {
            TelemetryError::malformed(1, format!("PRODUCT_VERSION_ID '{version_raw}'"))
        })?;

        Ok(Self {
            spacecraft_number,
            product_version_id,
            applicable_start: header_time(&entries, "APPLICABLE_START_TIME")?,
            applicable_stop: header_time(&entries, "APPLICABLE_STOP_TIME")?,
            product_creation: header_time(&entries, "PRODUCT_CREATION_TIME")?,
            entries,
        })
    }
}

/// One antenna booking.
#[derive(Debug, Clone, PartialEq)]
pub struct StationAllocation<'a> {
    pub start_of_activity: DateTime<Utc>,
    pub beginning_of_track: DateTime<Utc>,
    pub end_of_track: DateTime<Utc>,
    pub end_of_activity: DateTime<Utc>,
    fields: BTreeMap<&'static str, &'a str>,
}

impl<'a> StationAllocation<'a> {
    /// Splits a record into fields and resolves its four times.
    ///
    /// # Errors
    ///
    /// - `TelemetryError::MalformedRecord` - Line does not match the fixed-width layout or a time is invalid
    pub fn parse(line: &'a str, line_number: usize) -> Result<Self, TelemetryError> {
        let captures = ALLOCATION_RECORD.captures(line).ok_or_else(|| {
            tracing::error!("Misformatted station allocation on line {line_number}: {line}");
            TelemetryError::malformed(line_number, "record does not match station allocation layout")
        })?;

        let raw_day = &captures["day"];
        let day = NaiveDate::parse_from_str(raw_day, DAY_FORMAT).map_err(|e| {
            TelemetryError::malformed(line_number, format!("allocation day '{raw_day}': {e}"))
        })?;
        let at = |field: &str| -> Result<DateTime<Utc>, TelemetryError> {
            let raw = &captures[field];
            NaiveTime::parse_from_str(raw, CLOCK_FORMAT)
                .map(|time| day.and_time(time).and_utc())
                .map_err(|e| {
                    TelemetryError::malformed(line_number, format!("{field} '{raw}': {e}"))
                })
        };

        let start_of_activity = at("soa")?;
        let beginning_of_track = at("bot")?;
        let end_of_track = roll_over(at("eot")?, start_of_activity);
        let end_of_activity = roll_over(at("eoa")?, start_of_activity);

        let mut fields = BTreeMap::new();
        for &name in STATION_ALLOCATION_TEXT_FIELDS {
            if let Some(field) = captures.name(name) {
                fields.insert(name, field.as_str().trim());
            }
        }

        Ok(Self {
            start_of_activity,
            beginning_of_track,
            end_of_track,
            end_of_activity,
            fields,
        })
    }

    /// Returns the trimmed text of a named text field.
    pub fn field(&self, name: &str) -> Option<&'a str> {
        self.fields.get(name).copied()
    }

    /// Returns the instant behind a named time field.
    pub fn time_field(&self, name: &str) -> Option<DateTime<Utc>> {
        match name {
            "soa" => Some(self.start_of_activity),
            "bot" => Some(self.beginning_of_track),
            "eot" => Some(self.end_of_track),
            "eoa" => Some(self.end_of_activity),
            _ => None,
        }
    }
}

fn roll_over(end: DateTime<Utc>, start: DateTime<Utc>) -> DateTime<Utc> {
    if end < start {
        end + chrono::Duration::days(1)
    } else {
        end
    }
}
