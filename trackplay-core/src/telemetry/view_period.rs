//! Legacy DSN view-period prediction product.
//!
//! The product starts with an 11-line header: a delimiter line, nine
//! `KEY = VALUE;` lines and a closing delimiter. Every following line is a
//! fixed-width event record:
//!
//! ```text
//! YY DDD/HH:MM:SS EVENT            SC  ST PASS AZIM  ELEV  LHA_X DEC_Y RTLT
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use super::TelemetryError;

/// Number of header lines, including both delimiters.
pub const HEADER_LINES: usize = 11;

const HEADER_TIME_FORMAT: &str = "%Y-%jT%H:%M:%S";
const EVENT_TIME_FORMAT: &str = "%y %j/%H:%M:%S";

/// Field names a view-period record exposes to channel bindings.
pub const VIEW_PERIOD_FIELDS: &[&str] = &[
    "event",
    "spacecraft",
    "station",
    "pass",
    "azimuth",
    "elevation",
    "lha_x",
    "dec_y",
    "rtlt",
];

static EVENT_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<time>.{15}).(?P<event>.{16}).(?P<spacecraft>.{3}).(?P<station>.{2}).(?P<pass>.{4}).(?P<azimuth>.{5}).(?P<elevation>.{5}).(?P<lha_x>.{5}).(?P<dec_y>.{5}).(?P<rtlt>.{10})",
    )
    .expect("view period record pattern should compile")
});

/// Parsed view-period header.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPeriodHeader {
    pub spacecraft_number: u32,
    pub user_product_id: f64,
    pub applicable_start: DateTime<Utc>,
    pub applicable_stop: DateTime<Utc>,
    pub product_creation: DateTime<Utc>,
    /// Every `KEY = VALUE` pair as written
    pub entries: BTreeMap<String, String>,
}

impl ViewPeriodHeader {
    /// Parses the header from its [`HEADER_LINES`] lines.
    ///
    /// # Errors
    ///
    /// - `TelemetryError::MalformedRecord` - Wrong line count, missing key or unparseable value
    pub fn parse(lines: &[String]) -> Result<Self, TelemetryError> {
        let entries = header_entries(lines, "view period")?;

        let spacecraft_raw = header_entry(&entries, "DSN_SPACECRAFT_NUM")?;
        let spacecraft_number: u32 = spacecraft_raw.parse().map_err(|_| {
            TelemetryError::malformed(1, format!("DSN_SPACECRAFT_NUM '{spacecraft_raw}'"))
        })?;
        let product_raw = header_entry(&entries, "USER_PRODUCT_ID")?;
        let user_product_id: f64 = product_raw.parse().map_err(|_| {
            TelemetryError::malformed(1, format!("USER_PRODUCT_ID '{product_raw}'"))
        })?;

        let applicable_start = header_time(&entries, "APPLICABLE_START_TIME")?;
        let applicable_stop = header_time(&entries, "APPLICABLE_STOP_TIME")?;
        let product_creation = header_time(&entries, "PRODUCT_CREATION_TIME")?;

        Ok(Self {
            spacecraft_number,
            user_product_id,
            applicable_start,
            applicable_stop,
            product_creation,
            entries,
        })
    }
}

/// Collects the `KEY = VALUE;` lines between the two header delimiters.
pub(super) fn header_entries(
    lines: &[String],
    product: &str,
) -> Result<BTreeMap<String, String>, TelemetryError> {
    if lines.len() != HEADER_LINES {
        return Err(TelemetryError::malformed(
            lines.len(),
            format!(
                "{product} header needs {HEADER_LINES} lines, found {}",
                lines.len()
            ),
        ));
    }

    let mut entries = BTreeMap::new();
    for (index, line) in lines[1..HEADER_LINES - 1].iter().enumerate() {
        let line_number = index + 2;
        let (key, value) = line.split_once(" = ").ok_or_else(|| {
            TelemetryError::malformed(line_number, "header line is not KEY = VALUE")
        })?;
        let value = value.trim().trim_end_matches(';').trim();
        tracing::trace!("{product} header segment {key} = {value}");
        entries.insert(key.trim().to_string(), value.to_string());
    }
    Ok(entries)
}

pub(super) fn header_entry<'a>(
    entries: &'a BTreeMap<String, String>,
    key: &str,
) -> Result<&'a str, TelemetryError> {
    entries
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| TelemetryError::malformed(1, format!("header is missing {key}")))
}

pub(super) fn header_time(
    entries: &BTreeMap<String, String>,
    key: &str,
) -> Result<DateTime<Utc>, TelemetryError> {
    let raw = header_entry(entries, key)?;
    NaiveDateTime::parse_from_str(raw, HEADER_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| TelemetryError::malformed(1, format!("{key} '{raw}': {e}")))
}

/// One fixed-width event record with its raw field text.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPeriodEvent<'a> {
    pub time: DateTime<Utc>,
    fields: BTreeMap<&'static str, &'a str>,
}

impl<'a> ViewPeriodEvent<'a> {
    /// Splits a record into fields.
    ///
    /// # Errors
    ///
    /// - `TelemetryError::MalformedRecord` - Line does not match the fixed-width layout
    pub fn parse(line: &'a str, line_number: usize) -> Result<Self, TelemetryError> {
        let captures = EVENT_RECORD.captures(line).ok_or_else(|| {
            tracing::error!("Misformatted view period event on line {line_number}: {line}");
            TelemetryError::malformed(line_number, "record does not match view period layout")
        })?;

        let raw_time = &captures["time"];
        let time = NaiveDateTime::parse_from_str(raw_time, EVENT_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| {
                TelemetryError::malformed(line_number, format!("event time '{raw_time}': {e}"))
            })?;

        let mut fields = BTreeMap::new();
        for &name in VIEW_PERIOD_FIELDS {
            if let Some(field) = captures.name(name) {
                fields.insert(name, field.as_str().trim());
            }
        }

        Ok(Self { time, fields })
    }

    /// Returns the trimmed text of a named field.
    pub fn field(&self, name: &str) -> Option<&'a str> {
        self.fields.get(name).copied()
    }
}

/// Parses an `HH:MM:SS.fff` round-trip light time.
///
/// # Errors
///
/// - `TelemetryError::MalformedRecord` - Text is not `HH:MM:SS[.fff]`
pub fn parse_rtlt(text: &str, line_number: usize) -> Result<Duration, TelemetryError> {
    let malformed = || TelemetryError::malformed(line_number, format!("RTLT '{text}'"));

    let mut parts = text.trim().splitn(3, ':');
    let hours: u64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    let minutes: u64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    let seconds: f64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .filter(|s: &f64| s.is_finite() && *s >= 0.0)
        .ok_or_else(malformed)?;

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .ok_or_else(malformed)?;
    let fraction = Duration::try_from_secs_f64(seconds).map_err(|_| malformed())?;
    Duration::from_secs(whole)
        .checked_add(fraction)
        .ok_or_else(malformed)
}
