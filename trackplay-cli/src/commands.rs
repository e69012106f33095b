//! CLI command implementations

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use trackplay_core::{
    Channel, ClockResolution, DurationResolver, Sample, SampleTime, TelemetryFormat,
    TimeSeriesLoader, TrackplayConfig, TrackplayError, load_resolved,
};
use trackplay_sim::{ModelError, PlanModel, RegisterSnapshot, Simulation, WriteRecord};

/// How results are printed on stdout
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Telemetry layouts accepted by `inspect`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    ElapsedDelta,
    Cadence,
    Tabular,
    ViewPeriod,
    StationAllocation,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a plan and run it on the virtual clock
    Run {
        /// Plan file (JSON)
        #[arg(long)]
        plan: PathBuf,
        /// Stop at this many seconds after the epoch instead of running to completion
        #[arg(long)]
        until: Option<f64>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Reconstruct register state at an offset by replaying from the epoch
    Replay {
        /// Plan file (JSON)
        #[arg(long)]
        plan: PathBuf,
        /// Checkpoint in seconds after the epoch
        #[arg(long)]
        at: f64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run a plan and check that replays reproduce every intermediate state
    Verify {
        /// Plan file (JSON)
        #[arg(long)]
        plan: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Parse one telemetry file and print its records
    Inspect {
        /// Telemetry file
        file: PathBuf,
        #[arg(long, value_enum)]
        format: FormatArg,
        /// Channels in payload order; append `:text` for text channels
        #[arg(long, value_delimiter = ',', required = true)]
        channels: Vec<String>,
        /// Record interval for the cadence format
        #[arg(long)]
        interval: Option<f64>,
        /// Resolve record times against this RFC 3339 epoch
        #[arg(long)]
        epoch: Option<String>,
        #[arg(long, default_value = "seconds")]
        resolution: ClockResolution,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

impl Commands {
    /// Commands that build a plan keep a trace log on disk.
    pub fn writes_trace_log(&self) -> bool {
        !matches!(self, Commands::Inspect { .. })
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command, with context naming the input involved
pub fn handle_command(command: Commands, config: &TrackplayConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            plan,
            until,
            output,
        } => run_plan(&plan, until, output, config),
        Commands::Replay { plan, at, output } => replay_plan(&plan, at, output, config),
        Commands::Verify { plan, output } => verify_plan(&plan, output, config),
        Commands::Inspect {
            file,
            format,
            channels,
            interval,
            epoch,
            resolution,
            output,
        } => inspect_file(
            &file,
            telemetry_format(format, interval)?,
            parse_channels(&channels)?,
            epoch.as_deref(),
            resolution,
            output,
        ),
    }
}

/// Replaces plan and telemetry failures with their user-facing message.
///
/// Other failures keep their full context chain.
pub fn user_facing(error: anyhow::Error) -> anyhow::Error {
    let message = error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ModelError>() {
            e.is_user_error().then(|| e.user_message())
        } else if let Some(e) = cause.downcast_ref::<TrackplayError>() {
            e.is_user_error().then(|| e.user_message())
        } else {
            None
        }
    });

    match message {
        Some(message) => anyhow::anyhow!(message),
        None => error,
    }
}

fn load_simulation(plan: &Path, config: &TrackplayConfig) -> anyhow::Result<Simulation> {
    let model = PlanModel::load(plan, config)
        .with_context(|| format!("failed to build plan {}", plan.display()))?;

    for station in model.stations() {
        tracing::info!(
            "Station {}: {} records, {} effects, last offset {:?}",
            station.name,
            station.samples,
            station.effects,
            station.last_offset
        );
    }

    Ok(model.into_simulation())
}

fn seconds(value: f64, flag: &str) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("--{flag} must be a non-negative number of seconds"))
}

/// Run a plan to an offset or to completion
///
/// # Errors
/// - Plan could not be built
/// - `--until` is not a valid offset
pub fn run_plan(
    plan: &Path,
    until: Option<f64>,
    output: OutputFormat,
    config: &TrackplayConfig,
) -> anyhow::Result<()> {
    let mut simulation = load_simulation(plan, config)?;

    let report = match until {
        Some(until) => simulation.execute_until(seconds(until, "until")?)?,
        None => simulation.execute_to_completion()?,
    };

    match output {
        OutputFormat::Table => print!("{}", report.summary()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckpointOutput<'a> {
    at: Duration,
    writes: &'a [WriteRecord],
    snapshot: RegisterSnapshot,
    matches_live: bool,
}

/// Replay a plan from the epoch up to a checkpoint
///
/// # Errors
/// - Plan could not be built
/// - `--at` is not a valid offset
pub fn replay_plan(
    plan: &Path,
    at: f64,
    output: OutputFormat,
    config: &TrackplayConfig,
) -> anyhow::Result<()> {
    let at = seconds(at, "at")?;
    let mut simulation = load_simulation(plan, config)?;
    let live = simulation.execute_until(at)?;
    let checkpoint = simulation.checkpoint(at)?;

    let result = CheckpointOutput {
        at,
        writes: &checkpoint.writes,
        snapshot: checkpoint.registers.snapshot(),
        matches_live: checkpoint.registers.snapshot().digest == live.snapshot.digest,
    };

    match output {
        OutputFormat::Table => {
            println!("Checkpoint at {:?}", result.at);
            println!("{:-<60}", "");
            println!("Writes replayed: {}", result.writes.len());
            for (name, value) in &result.snapshot.values {
                println!("  {name} = {value}");
            }
            println!("State digest: {}", result.snapshot.digest);
            println!("Matches live run: {}", result.matches_live);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if !result.matches_live {
        bail!("replay at {at:?} diverged from the live run");
    }
    Ok(())
}

/// Run a plan and replay it at every fire offset
///
/// # Errors
/// - Plan could not be built
/// - Any replay diverged from the live run
pub fn verify_plan(
    plan: &Path,
    output: OutputFormat,
    config: &TrackplayConfig,
) -> anyhow::Result<()> {
    let mut simulation = load_simulation(plan, config)?;
    simulation.execute_to_completion()?;
    let verification = simulation.verify_replay()?;

    match output {
        OutputFormat::Table => {
            println!("Replay verification");
            println!("{:-<60}", "");
            println!("Checkpoints replayed: {}", verification.checkpoints);
            println!("Live digest:     {}", verification.live_digest);
            println!("Replayed digest: {}", verification.replayed_digest);
            for offset in &verification.mismatched_offsets {
                println!("  diverged at {offset:?}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verification)?),
    }

    if !verification.is_consistent() {
        bail!(
            "replay diverged at {} of {} checkpoints",
            verification.mismatched_offsets.len(),
            verification.checkpoints
        );
    }
    Ok(())
}

fn telemetry_format(format: FormatArg, interval: Option<f64>) -> anyhow::Result<TelemetryFormat> {
    Ok(match format {
        FormatArg::ElapsedDelta => TelemetryFormat::ElapsedDelta,
        FormatArg::Cadence => {
            let interval_secs = interval.context("--interval is required for the cadence format")?;
            if !interval_secs.is_finite() || interval_secs <= 0.0 {
                bail!("--interval must be positive, got {interval_secs}");
            }
            TelemetryFormat::Cadence { interval_secs }
        }
        FormatArg::Tabular => TelemetryFormat::Tabular,
        FormatArg::ViewPeriod => TelemetryFormat::ViewPeriod,
        FormatArg::StationAllocation => TelemetryFormat::StationAllocation,
    })
}

/// Parses `name`, `name:real` or `name:text` channel declarations.
fn parse_channels(specs: &[String]) -> anyhow::Result<Vec<Channel>> {
    specs
        .iter()
        .map(|spec| match spec.split_once(':') {
            Some((name, "text")) => Ok(Channel::text(name)),
            Some((name, "real")) => Ok(Channel::real(name)),
            Some((name, kind)) => {
                bail!("channel {name} has unknown kind '{kind}', expected real or text")
            }
            None => Ok(Channel::real(spec)),
        })
        .collect()
}

fn open_telemetry(file: &Path) -> trackplay_core::Result<BufReader<File>> {
    Ok(BufReader::new(File::open(file)?))
}

fn load_samples(
    file: &Path,
    format: &TelemetryFormat,
    channels: Vec<Channel>,
) -> trackplay_core::Result<Vec<Sample>> {
    let loader = TimeSeriesLoader::new(open_telemetry(file)?, format, channels)?;
    Ok(loader.load_all()?)
}

#[derive(Serialize)]
struct InspectedRecord {
    line: usize,
    time: String,
    values: Vec<trackplay_core::RegisterValue>,
}

/// Parse a telemetry file and print every record
///
/// # Errors
/// - File could not be opened
/// - Any record failed to parse, or resolved before `--epoch`
pub fn inspect_file(
    file: &Path,
    format: TelemetryFormat,
    channels: Vec<Channel>,
    epoch: Option<&str>,
    resolution: ClockResolution,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let names: Vec<String> = channels.iter().map(|c| c.name.clone()).collect();
    let context = || format!("failed to load {}", file.display());

    let records: Vec<InspectedRecord> = match epoch {
        Some(epoch) => {
            let epoch: DateTime<Utc> = DateTime::parse_from_rfc3339(epoch)
                .with_context(|| format!("--epoch '{epoch}' is not RFC 3339"))?
                .with_timezone(&Utc);
            let resolver = DurationResolver::new(epoch, resolution);
            let reader =
                open_telemetry(file).with_context(|| format!("failed to open {}", file.display()))?;
            load_resolved(reader, &format, channels, &resolver)
                .map_err(TrackplayError::from)
                .with_context(context)?
                .into_iter()
                .map(|sample| InspectedRecord {
                    line: sample.line,
                    time: format!("+{:?}", sample.offset),
                    values: sample.payload,
                })
                .collect()
        }
        None => load_samples(file, &format, channels)
            .with_context(context)?
            .into_iter()
            .map(|sample| InspectedRecord {
                line: sample.line,
                time: match sample.time {
                    SampleTime::Elapsed(seconds) => format!("{seconds}s"),
                    SampleTime::Absolute(timestamp) => timestamp.to_rfc3339(),
                },
                values: sample.payload,
            })
            .collect(),
    };

    match output {
        OutputFormat::Table => {
            println!("{:>6}  {:<28}  {}", "line", "time", names.join("  "));
            println!("{:-<60}", "");
            for record in &records {
                let values: Vec<String> = record.values.iter().map(|v| v.to_string()).collect();
                println!("{:>6}  {:<28}  {}", record.line, record.time, values.join("  "));
            }
            println!("{} records", records.len());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels() {
        let channels = parse_channels(&[
            "azimuth".to_string(),
            "event:text".to_string(),
            "elevation:real".to_string(),
        ])
        .unwrap();

        assert_eq!(
            channels,
            vec![
                Channel::real("azimuth"),
                Channel::text("event"),
                Channel::real("elevation")
            ]
        );
    }

    #[test]
    fn test_parse_channels_rejects_unknown_kind() {
        let result = parse_channels(&["azimuth".to_string(), "elevation:foo".to_string()]);

        let error = result.unwrap_err();
        assert!(error.to_string().contains("unknown kind 'foo'"));
    }

    #[test]
    fn test_user_facing_plan_error() {
        let error = anyhow::Error::new(ModelError::Resource {
            station: "DSS-13".to_string(),
            source: trackplay_core::ResourceError::NotFound {
                id: "/az_el_DSS-13.txt".to_string(),
            },
        })
        .context("failed to build plan plan.json");

        assert_eq!(
            user_facing(error).to_string(),
            "Station DSS-13: Telemetry resource /az_el_DSS-13.txt not found"
        );
    }

    #[test]
    fn test_user_facing_keeps_other_errors() {
        let error = anyhow::anyhow!("replay diverged");
        assert_eq!(user_facing(error).to_string(), "replay diverged");
    }

    #[test]
    fn test_inspect_malformed_file_is_user_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("az_el.txt");
        std::fs::write(&file, "10 1.0 2.0
5 abc 4.0
").unwrap();

        let error = inspect_file(
            &file,
            TelemetryFormat::ElapsedDelta,
            vec![Channel::real("azimuth"), Channel::real("elevation")],
            None,
            ClockResolution::Seconds,
            OutputFormat::Table,
        )
        .unwrap_err();

        assert!(
            user_facing(error)
                .to_string()
                .starts_with("Telemetry line 2 is malformed")
        );
    }

    #[test]
    fn test_cadence_requires_interval() {
        assert!(telemetry_format(FormatArg::Cadence, None).is_err());
        assert!(telemetry_format(FormatArg::Cadence, Some(0.0)).is_err());
        assert_eq!(
            telemetry_format(FormatArg::Cadence, Some(1.5)).unwrap(),
            TelemetryFormat::Cadence { interval_secs: 1.5 }
        );
    }

    #[test]
    fn test_negative_seconds_rejected() {
        assert!(seconds(-1.0, "until").is_err());
        assert_eq!(seconds(3600.0, "until").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_run_and_verify_plan_from_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("az_el_DSS-13.txt"),
            "3600 10.0 20.0\n3600 11.0 21.0\n",
        )
        .unwrap();
        let epoch = DateTime::parse_from_rfc3339("2023-08-18T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let plan_path = temp_dir.path().join("plan.json");
        std::fs::write(
            &plan_path,
            serde_json::to_string(&trackplay_core::PlanConfig::dss13_default(epoch)).unwrap(),
        )
        .unwrap();
        let config = TrackplayConfig {
            resource_root: temp_dir.path().to_path_buf(),
            ..TrackplayConfig::default()
        };

        run_plan(&plan_path, Some(3600.0), OutputFormat::Json, &config).unwrap();
        replay_plan(&plan_path, 3600.0, OutputFormat::Table, &config).unwrap();
        verify_plan(&plan_path, OutputFormat::Table, &config).unwrap();
    }
}
