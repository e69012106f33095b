//! Line-oriented telemetry loader.

use std::io::{BufRead, Lines};

use chrono::{DateTime, NaiveDateTime, Utc};

use super::resolver::DurationResolver;
use super::station_allocation::{
    STATION_ALLOCATION_TEXT_FIELDS, STATION_ALLOCATION_TIME_FIELDS, StationAllocation,
    StationAllocationHeader,
};
use super::types::{Channel, ResolvedSample, Sample, SampleTime, TelemetryFormat};
use super::view_period::{self, HEADER_LINES, VIEW_PERIOD_FIELDS, ViewPeriodEvent, ViewPeriodHeader};
use super::TelemetryError;
use crate::value::{RegisterValue, ValueKind};

/// Naive timestamp layouts accepted in tabular inputs, interpreted as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%jT%H:%M:%S%.f"];

/// Where each declared channel is found in a record.
#[derive(Debug)]
enum Layout {
    /// Tokens after the time delta, in channel order
    ElapsedDelta,
    /// All tokens, in channel order
    Cadence { interval_secs: f64 },
    /// Column index per channel, resolved from the header line
    Tabular { columns: Vec<usize> },
    /// Named fixed-width fields
    ViewPeriod { header: Box<ViewPeriodHeader> },
    /// Named fixed-width fields, four times per record
    StationAllocation {
        header: Box<StationAllocationHeader>,
    },
}

/// Parses a telemetry stream into time-ordered samples.
///
/// Reads exactly one physical line per record and consumes the stream once.
/// Iteration stops after the first error; callers that need all-or-nothing
/// semantics use [`TimeSeriesLoader::load_all`].
pub struct TimeSeriesLoader<R> {
    lines: Lines<R>,
    layout: Layout,
    channels: Vec<Channel>,
    line_number: usize,
    sequence: usize,
    elapsed_secs: f64,
    finished: bool,
}

impl<R: BufRead> TimeSeriesLoader<R> {
    /// Creates a loader, consuming any header the format declares.
    ///
    /// # Errors
    ///
    /// - `TelemetryError::MalformedRecord` - Header is missing or does not provide a declared channel
    /// - `TelemetryError::Io` - Header could not be read
    pub fn new(
        reader: R,
        format: &TelemetryFormat,
        channels: Vec<Channel>,
    ) -> Result<Self, TelemetryError> {
        let mut loader = Self {
            lines: reader.lines(),
            layout: Layout::ElapsedDelta,
            channels,
            line_number: 0,
            sequence: 0,
            elapsed_secs: 0.0,
            finished: false,
        };

        loader.layout = match format {
            TelemetryFormat::ElapsedDelta => Layout::ElapsedDelta,
            TelemetryFormat::Cadence { interval_secs } => Layout::Cadence {
                interval_secs: *interval_secs,
            },
            TelemetryFormat::Tabular => loader.read_tabular_header()?,
            TelemetryFormat::ViewPeriod => loader.read_view_period_header()?,
            TelemetryFormat::StationAllocation => loader.read_station_allocation_header()?,
        };

        tracing::debug!(
            "Telemetry loader ready: format={}, channels={}",
            format.as_str(),
            loader.channels.len()
        );

        Ok(loader)
    }

    /// Returns the view-period header when loading that format.
    pub fn view_period_header(&self) -> Option<&ViewPeriodHeader> {
        match &self.layout {
            Layout::ViewPeriod { header } => Some(header),
            _ => None,
        }
    }

    /// Returns the station allocation header when loading that format.
    pub fn station_allocation_header(&self) -> Option<&StationAllocationHeader> {
        match &self.layout {
            Layout::StationAllocation { header } => Some(header),
            _ => None,
        }
    }

    /// Drains the stream into a vector of samples.
    ///
    /// # Errors
    ///
    /// Returns the first record error; no samples are returned in that case.
    pub fn load_all(self) -> Result<Vec<Sample>, TelemetryError> {
        self.collect()
    }

    fn next_line(&mut self) -> Option<Result<String, TelemetryError>> {
        let line = self.lines.next()?;
        match line {
            Ok(line) => {
                self.line_number += 1;
                Some(Ok(line))
            }
            Err(source) => Some(Err(TelemetryError::Io {
                line: self.line_number,
                source,
            })),
        }
    }

    fn read_tabular_header(&mut self) -> Result<Layout, TelemetryError> {
        let header = loop {
            match self.next_line() {
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => break line,
                Some(Err(e)) => return Err(e),
                None => return Err(TelemetryError::malformed(0, "missing header line")),
            }
        };

        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let mut columns = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let column = names
                .iter()
                .skip(1)
                .position(|name| *name == channel.name)
                .map(|index| index + 1)
                .ok_or_else(|| {
                    TelemetryError::malformed(
                        self.line_number,
                        format!("header has no column named {}", channel.name),
                    )
                })?;
            columns.push(column);
        }

        Ok(Layout::Tabular { columns })
    }

    fn read_view_period_header(&mut self) -> Result<Layout, TelemetryError> {
        self.check_named_fields(VIEW_PERIOD_FIELDS, "view period")?;
        let header = ViewPeriodHeader::parse(&self.read_product_header()?)?;

        tracing::info!(
            "View period product for spacecraft {} covering {} to {}",
            header.spacecraft_number,
            header.applicable_start,
            header.applicable_stop
        );

        Ok(Layout::ViewPeriod {
            header: Box::new(header),
        })
    }

    fn read_station_allocation_header(&mut self) -> Result<Layout, TelemetryError> {
        let fields: Vec<&str> = STATION_ALLOCATION_TEXT_FIELDS
            .iter()
            .chain(STATION_ALLOCATION_TIME_FIELDS)
            .copied()
            .collect();
        self.check_named_fields(&fields, "station allocation")?;
        let header = StationAllocationHeader::parse(&self.read_product_header()?)?;

        tracing::info!(
            "Station allocation file v{} for spacecraft {} covering {} to {}",
            header.product_version_id,
            header.spacecraft_number,
            header.applicable_start,
            header.applicable_stop
        );

        Ok(Layout::StationAllocation {
            header: Box::new(header),
        })
    }

    fn check_named_fields(&self, fields: &[&str], product: &str) -> Result<(), TelemetryError> {
        match self
            .channels
            .iter()
            .find(|channel| !fields.contains(&channel.name.as_str()))
        {
            Some(channel) => Err(TelemetryError::malformed(
                0,
                format!("{product} records have no field named {}", channel.name),
            )),
            None => Ok(()),
        }
    }

    fn read_product_header(&mut self) -> Result<Vec<String>, TelemetryError> {
        let mut lines = Vec::with_capacity(HEADER_LINES);
        while lines.len() < HEADER_LINES {
            match self.next_line() {
                Some(line) => lines.push(line?),
                None => break,
            }
        }
        Ok(lines)
    }

    fn parse_record(&mut self, line: &str) -> Result<Sample, TelemetryError> {
        let line_number = self.line_number;
        let (time, payload) = match &self.layout {
            Layout::ElapsedDelta => {
                let mut tokens = line.split_whitespace();
                let delta_token = tokens.next().unwrap_or_default();
                let delta = parse_real(delta_token, "time delta", line_number)?;
                let payload = parse_positional(tokens, &self.channels, line_number)?;
                // Deltas accumulate only once the whole record parsed
                self.elapsed_secs += delta;
                (SampleTime::Elapsed(self.elapsed_secs), payload)
            }
            Layout::Cadence { interval_secs } => {
                let payload =
                    parse_positional(line.split_whitespace(), &self.channels, line_number)?;
                let elapsed = (self.sequence + 1) as f64 * interval_secs;
                (SampleTime::Elapsed(elapsed), payload)
            }
            Layout::Tabular { columns } => {
                let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
                let timestamp = parse_timestamp(fields[0], line_number)?;
                let mut payload = Vec::with_capacity(columns.len());
                for (channel, &column) in self.channels.iter().zip(columns) {
                    let token = fields.get(column).copied().ok_or_else(|| {
                        TelemetryError::malformed(
                            line_number,
                            format!("missing column {} ({})", column + 1, channel.name),
                        )
                    })?;
                    payload.push(parse_value(token, channel, line_number)?);
                }
                (SampleTime::Absolute(timestamp), payload)
            }
            Layout::ViewPeriod { .. } => {
                let event = ViewPeriodEvent::parse(line, line_number)?;
                let mut payload = Vec::with_capacity(self.channels.len());
                for channel in &self.channels {
                    let token = event.field(&channel.name).unwrap_or_default();
                    let value = if channel.name == "rtlt" && channel.kind == ValueKind::Real {
                        RegisterValue::Real(
                            view_period::parse_rtlt(token, line_number)?.as_secs_f64(),
                        )
                    } else {
                        parse_value(token, channel, line_number)?
                    };
                    payload.push(value);
                }
                (SampleTime::Absolute(event.time), payload)
            }
            Layout::StationAllocation { .. } => {
                let allocation = StationAllocation::parse(line, line_number)?;
                let start = allocation.start_of_activity;
                let mut payload = Vec::with_capacity(self.channels.len());
                for channel in &self.channels {
                    let value = match allocation.time_field(&channel.name) {
                        Some(at) => match channel.kind {
                            ValueKind::Real => {
                                RegisterValue::Real((at - start).num_seconds() as f64)
                            }
                            ValueKind::Text => RegisterValue::Text(at.to_rfc3339()),
                        },
                        None => parse_value(
                            allocation.field(&channel.name).unwrap_or_default(),
                            channel,
                            line_number,
                        )?,
                    };
                    payload.push(value);
                }
                (SampleTime::Absolute(start), payload)
            }
        };

        let sample = Sample {
            line: line_number,
            sequence: self.sequence,
            time,
            payload,
        };
        self.sequence += 1;

        tracing::trace!("Parsed telemetry record {:?}", sample);
        Ok(sample)
    }
}

impl<R: BufRead> Iterator for TimeSeriesLoader<R> {
    type Item = Result<Sample, TelemetryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.next_line() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(line)) => line,
            };

            if line.trim().is_empty() {
                continue;
            }

            let result = self.parse_record(&line);
            if result.is_err() {
                self.finished = true;
            }
            return Some(result);
        }
    }
}

/// Loads and resolves a whole telemetry stream.
///
/// Either every record is returned with its offset, or the first failure is.
///
/// # Errors
///
/// - `TelemetryError::MalformedRecord` - Any record or header failed to parse
/// - `TelemetryError::BeforeEpoch` - Any record resolved before the plan epoch
/// - `TelemetryError::Io` - The stream failed mid-read
pub fn load_resolved<R: BufRead>(
    reader: R,
    format: &TelemetryFormat,
    channels: Vec<Channel>,
    resolver: &DurationResolver,
) -> Result<Vec<ResolvedSample>, TelemetryError> {
    let loader = TimeSeriesLoader::new(reader, format, channels)?;
    let samples = loader.load_all()?;
    let resolved = samples
        .into_iter()
        .map(|sample| resolver.resolve_sample(sample))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        "Loaded {} {} records, last offset {:?}",
        resolved.len(),
        format.as_str(),
        resolved.last().map(|sample| sample.offset)
    );

    Ok(resolved)
}

fn parse_positional<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    channels: &[Channel],
    line_number: usize,
) -> Result<Vec<RegisterValue>, TelemetryError> {
    let mut payload = Vec::with_capacity(channels.len());
    for (index, channel) in channels.iter().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            TelemetryError::malformed(
                line_number,
                format!(
                    "expected {} payload fields, found {index}",
                    channels.len()
                ),
            )
        })?;
        payload.push(parse_value(token, channel, line_number)?);
    }
    Ok(payload)
}

fn parse_value(
    token: &str,
    channel: &Channel,
    line_number: usize,
) -> Result<RegisterValue, TelemetryError> {
    match channel.kind {
        ValueKind::Real => parse_real(token, &channel.name, line_number).map(RegisterValue::Real),
        ValueKind::Text => Ok(RegisterValue::Text(token.to_string())),
    }
}

fn parse_real(token: &str, field: &str, line_number: usize) -> Result<f64, TelemetryError> {
    if token.is_empty() {
        return Err(TelemetryError::malformed(
            line_number,
            format!("missing {field}"),
        ));
    }

    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(TelemetryError::malformed(
            line_number,
            format!("{field} '{token}' is not finite"),
        )),
        Err(e) => Err(TelemetryError::malformed(
            line_number,
            format!("{field} '{token}': {e}"),
        )),
    }
}

fn parse_timestamp(token: &str, line_number: usize) -> Result<DateTime<Utc>, TelemetryError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(token) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(token, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            TelemetryError::malformed(line_number, format!("timestamp '{token}' is not ISO-8601"))
        })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::telemetry::ClockResolution;

    fn az_el() -> Vec<Channel> {
        vec![Channel::real("azimuth"), Channel::real("elevation")]
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 8, 18, 0, 0, 0).unwrap()
    }

    fn load(text: &str, format: TelemetryFormat, channels: Vec<Channel>) -> Vec<Sample> {
        TimeSeriesLoader::new(Cursor::new(text.to_string()), &format, channels)
            .unwrap()
            .load_all()
            .unwrap()
    }

    #[test]
    fn test_deltas_accumulate() {
        let samples = load(
            "10 1.0 2.0\n5 3.0 4.0\n20 5.0 6.0\n",
            TelemetryFormat::ElapsedDelta,
            az_el(),
        );

        let times: Vec<SampleTime> = samples.iter().map(|s| s.time).collect();
        assert_eq!(
            times,
            vec![
                SampleTime::Elapsed(10.0),
                SampleTime::Elapsed(15.0),
                SampleTime::Elapsed(35.0)
            ]
        );
        assert_eq!(
            samples[1].payload,
            vec![RegisterValue::Real(3.0), RegisterValue::Real(4.0)]
        );
    }

    #[test]
    fn test_every_line_is_one_record() {
        let text: String = (0..7).map(|i| format!("1 {i}.0 {i}.5\n")).collect();
        let samples = load(&text, TelemetryFormat::ElapsedDelta, az_el());

        assert_eq!(samples.len(), 7);
        let lines: Vec<usize> = samples.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4, 5, 6, 7]);
        let sequences: Vec<usize> = samples.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_blank_lines_and_extra_whitespace() {
        let samples = load(
            "  3600\t10.0   20.0 \n\n3600 11.0 21.0 99.0\n",
            TelemetryFormat::ElapsedDelta,
            az_el(),
        );

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].line, 3);
        assert_eq!(samples[1].time, SampleTime::Elapsed(7200.0));
    }

    #[test]
    fn test_non_numeric_token_aborts_load() {
        let loader = TimeSeriesLoader::new(
            Cursor::new("10 1.0 2.0\n5 abc 4.0\n20 5.0 6.0\n"),
            &TelemetryFormat::ElapsedDelta,
            az_el(),
        )
        .unwrap();

        let result = loader.load_all();
        assert!(matches!(
            result,
            Err(TelemetryError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_short_record_is_malformed() {
        let loader = TimeSeriesLoader::new(
            Cursor::new("10 1.0\n"),
            &TelemetryFormat::ElapsedDelta,
            az_el(),
        )
        .unwrap();

        let result = loader.load_all();
        assert!(matches!(
            result,
            Err(TelemetryError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_value_is_malformed() {
        let loader = TimeSeriesLoader::new(
            Cursor::new("10 NaN 2.0\n"),
            &TelemetryFormat::ElapsedDelta,
            az_el(),
        )
        .unwrap();

        assert!(loader.load_all().is_err());
    }

    #[test]
    fn test_iteration_stops_after_error() {
        let mut loader = TimeSeriesLoader::new(
            Cursor::new("x 1.0 2.0\n5 3.0 4.0\n"),
            &TelemetryFormat::ElapsedDelta,
            az_el(),
        )
        .unwrap();

        assert!(matches!(loader.next(), Some(Err(_))));
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_cadence_stamps_records() {
        let samples = load(
            "3.14\n1717\n1115\n57\n",
            TelemetryFormat::Cadence {
                interval_secs: 3600.0,
            },
            vec![Channel::real("value")],
        );

        let times: Vec<SampleTime> = samples.iter().map(|s| s.time).collect();
        assert_eq!(
            times,
            vec![
                SampleTime::Elapsed(3600.0),
                SampleTime::Elapsed(7200.0),
                SampleTime::Elapsed(10800.0),
                SampleTime::Elapsed(14400.0)
            ]
        );
        assert_eq!(samples[3].payload, vec![RegisterValue::Real(57.0)]);
    }

    #[test]
    fn test_tabular_selects_columns_by_name() {
        let text = "time\televation\tazimuth\tlabel\n\
                    2023-08-18T01:00:00Z\t20.0\t10.0\tRISE\n\
                    2023-08-18T02:00:00\t21.0\t11.0\tSET\n";
        let samples = load(
            text,
            TelemetryFormat::Tabular,
            vec![
                Channel::real("azimuth"),
                Channel::real("elevation"),
                Channel::text("label"),
            ],
        );

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].line, 2);
        assert_eq!(
            samples[0].time,
            SampleTime::Absolute(Utc.with_ymd_and_hms(2023, 8, 18, 1, 0, 0).unwrap())
        );
        assert_eq!(
            samples[1].payload,
            vec![
                RegisterValue::Real(11.0),
                RegisterValue::Real(21.0),
                RegisterValue::from("SET")
            ]
        );
    }

    #[test]
    fn test_tabular_missing_column_fails_at_header() {
        let result = TimeSeriesLoader::new(
            Cursor::new("time\tazimuth\n"),
            &TelemetryFormat::Tabular,
            az_el(),
        );

        assert!(matches!(
            result,
            Err(TelemetryError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_tabular_bad_timestamp() {
        let loader = TimeSeriesLoader::new(
            Cursor::new("time\tazimuth\televation\nyesterday\t1.0\t2.0\n"),
            &TelemetryFormat::Tabular,
            az_el(),
        )
        .unwrap();

        assert!(matches!(
            loader.load_all(),
            Err(TelemetryError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_view_period_records() {
        let text = crate::test_fixtures::view_period_product(&[
            ("20 223/01:02:03", "RISE", 123.4, 10.5),
            ("20 223/05:00:00", "SET", 250.0, 0.0),
        ]);
        let mut loader = TimeSeriesLoader::new(
            Cursor::new(text),
            &TelemetryFormat::ViewPeriod,
            vec![
                Channel::real("azimuth"),
                Channel::real("elevation"),
                Channel::text("event"),
                Channel::real("rtlt"),
            ],
        )
        .unwrap();

        assert_eq!(loader.view_period_header().unwrap().spacecraft_number, 168);

        let first = loader.next().unwrap().unwrap();
        assert_eq!(first.line, 12);
        assert_eq!(
            first.time,
            SampleTime::Absolute(Utc.with_ymd_and_hms(2020, 8, 10, 1, 2, 3).unwrap())
        );
        assert_eq!(first.payload[0], RegisterValue::Real(123.4));
        assert_eq!(first.payload[2], RegisterValue::from("RISE"));
        assert_eq!(first.payload[3], RegisterValue::Real(1325.5));

        let second = loader.next().unwrap().unwrap();
        assert_eq!(second.payload[1], RegisterValue::Real(0.0));
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_view_period_unknown_field() {
        let text = crate::test_fixtures::view_period_product(&[]);
        let result = TimeSeriesLoader::new(
            Cursor::new(text),
            &TelemetryFormat::ViewPeriod,
            vec![Channel::real("range")],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_station_allocation_records() {
        let text = crate::test_fixtures::station_allocation_product(&[
            ("20 223", ["0100", "0130", "0500", "0515"], "TKG PASS"),
            ("20 223", ["2300", "2330", "0100", "0115"], "TKG PASS"),
        ]);
        let mut loader = TimeSeriesLoader::new(
            Cursor::new(text),
            &TelemetryFormat::StationAllocation,
            vec![
                Channel::text("antenna"),
                Channel::real("pass"),
                Channel::real("eoa"),
                Channel::text("eot"),
            ],
        )
        .unwrap();

        assert_eq!(
            loader.station_allocation_header().unwrap().product_version_id,
            2.0
        );
        assert!(loader.view_period_header().is_none());

        let first = loader.next().unwrap().unwrap();
        assert_eq!(first.line, 12);
        assert_eq!(
            first.time,
            SampleTime::Absolute(Utc.with_ymd_and_hms(2020, 8, 10, 1, 0, 0).unwrap())
        );
        assert_eq!(
            first.payload,
            vec![
                RegisterValue::from("DSS-14"),
                RegisterValue::Real(1234.0),
                RegisterValue::Real(4.0 * 3600.0 + 15.0 * 60.0),
                RegisterValue::from("2020-08-10T05:00:00+00:00"),
            ]
        );

        let second = loader.next().unwrap().unwrap();
        assert_eq!(second.payload[2], RegisterValue::Real(2.0 * 3600.0 + 15.0 * 60.0));
        assert_eq!(
            second.payload[3],
            RegisterValue::from("2020-08-11T01:00:00+00:00")
        );
        assert!(loader.next().is_none());
    }

    #[test]
    fn test_station_allocation_unknown_field() {
        let text = crate::test_fixtures::station_allocation_product(&[]);
        let result = TimeSeriesLoader::new(
            Cursor::new(text),
            &TelemetryFormat::StationAllocation,
            vec![Channel::real("rtlt")],
        );

        assert!(matches!(
            result,
            Err(TelemetryError::MalformedRecord { line: 0, .. })
        ));
    }

    #[test]
    fn test_view_period_oversized_rtlt_is_malformed() {
        let text = crate::test_fixtures::view_period_product(&[(
            "20 223/01:02:03",
            "RISE",
            123.4,
            10.5,
        )])
        .replace("00:22:05.5", " 0:0:1e300");
        let loader = TimeSeriesLoader::new(
            Cursor::new(text),
            &TelemetryFormat::ViewPeriod,
            vec![Channel::real("rtlt")],
        )
        .unwrap();

        assert!(matches!(
            loader.load_all(),
            Err(TelemetryError::MalformedRecord { line: 12, .. })
        ));
    }

    #[test]
    fn test_load_resolved_cumulative_offsets() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Seconds);
        let resolved = load_resolved(
            Cursor::new("10 1 2\n5 1 2\n20 1 2\n"),
            &TelemetryFormat::ElapsedDelta,
            az_el(),
            &resolver,
        )
        .unwrap();

        let offsets: Vec<Duration> = resolved.iter().map(|s| s.offset).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(15),
                Duration::from_secs(35)
            ]
        );
    }

    #[test]
    fn test_load_resolved_before_epoch_fails() {
        let resolver = DurationResolver::new(epoch(), ClockResolution::Seconds);
        let result = load_resolved(
            Cursor::new("time\tazimuth\televation\n2023-08-17T23:59:59Z\t1\t2\n"),
            &TelemetryFormat::Tabular,
            az_el(),
            &resolver,
        );

        assert!(matches!(
            result,
            Err(TelemetryError::BeforeEpoch { line: 2, .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_elapsed_is_running_sum_of_deltas(
            deltas in proptest::collection::vec(0u32..10_000, 1..50),
        ) {
            let text: String = deltas.iter().map(|d| format!("{d} 1.0 2.0\n")).collect();
            let samples = load(&text, TelemetryFormat::ElapsedDelta, az_el());

            proptest::prop_assert_eq!(samples.len(), deltas.len());
            let mut total = 0.0;
            for (sample, delta) in samples.iter().zip(&deltas) {
                total += f64::from(*delta);
                proptest::prop_assert_eq!(sample.time, SampleTime::Elapsed(total));
            }
        }
    }
}
