//! Explicit model construction from plan configuration.
//!
//! A station model loads its whole telemetry file, resolves every record
//! against the plan epoch, declares its registers and defers one `SetValue`
//! per record and bound channel. Construction either schedules everything or
//! leaves the register set and the host untouched.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use trackplay_core::{
    ChannelBinding, ConfigError, DurationResolver, FileResources, PlanConfig, ResourceError,
    ResourceOpener, StationConfig, TelemetryError, TrackplayConfig, load_resolved,
};

use crate::deterministic::{
    DeferredEffectQueue, Effect, EffectHost, RegisterId, RegisterSet, Simulation, SimulationError,
};

/// Errors that abort model construction.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Telemetry input could not be opened
    #[error("Station {station}: {source}")]
    Resource {
        /// Station being built
        station: String,
        /// Underlying failure
        #[source]
        source: ResourceError,
    },

    /// Telemetry input could not be loaded or resolved
    #[error("Station {station}: {source}")]
    Telemetry {
        /// Station being built
        station: String,
        /// Underlying failure
        #[source]
        source: TelemetryError,
    },

    /// Registers could not be declared or effects could not be deferred
    #[error("Station {station}: {source}")]
    Scheduling {
        /// Station being built
        station: String,
        /// Underlying failure
        #[source]
        source: SimulationError,
    },

    /// Plan could not be read or failed validation
    #[error("Plan error: {0}")]
    Config(#[from] ConfigError),
}

impl ModelError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ModelError::Resource { station, source } => {
                format!("Station {station}: {}", source.user_message())
            }
            ModelError::Telemetry { station, source } => {
                format!("Station {station}: {}", source.user_message())
            }
            ModelError::Scheduling { station, source } => {
                format!("Station {station} could not be scheduled: {source}")
            }
            ModelError::Config(e) => e.user_message(),
        }
    }

    /// Checks if this error is due to the plan or its telemetry inputs.
    pub fn is_user_error(&self) -> bool {
        match self {
            ModelError::Resource { source, .. } => {
                matches!(source, ResourceError::NotFound { .. })
            }
            ModelError::Telemetry { source, .. } => !matches!(source, TelemetryError::Io { .. }),
            ModelError::Scheduling { .. } => true,
            ModelError::Config(ConfigError::Io { .. }) => false,
            ModelError::Config(_) => true,
        }
    }
}

/// Registers and schedule contributed by one station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationModel {
    pub name: String,
    /// Declared registers in channel order
    pub registers: Vec<(String, RegisterId)>,
    /// Records loaded from the telemetry input
    pub samples: usize,
    /// Effects deferred to the host
    pub effects: usize,
    /// Offset of the last record
    pub last_offset: Option<Duration>,
}

impl StationModel {
    /// Builds one station into `registers` and `host`.
    ///
    /// # Errors
    ///
    /// - `ModelError::Resource` - The telemetry input could not be opened
    /// - `ModelError::Telemetry` - Any record failed to parse or resolve
    /// - `ModelError::Scheduling` - A register name is taken or the host refused the batch
    pub fn build(
        config: &StationConfig,
        resolver: &DurationResolver,
        opener: &dyn ResourceOpener,
        registers: &mut RegisterSet,
        host: &mut impl EffectHost,
    ) -> Result<Self, ModelError> {
        tracing::info!(
            "Building station {} from {} ({})",
            config.name,
            config.resource,
            config.format.as_str()
        );

        let reader = opener
            .open(&config.resource)
            .map_err(|source| ModelError::Resource {
                station: config.name.clone(),
                source,
            })?;
        let channels = config.channels.iter().map(ChannelBinding::as_channel).collect();
        let samples = load_resolved(reader, &config.format, channels, resolver).map_err(|source| {
            tracing::error!("Station {} telemetry rejected: {source}", config.name);
            ModelError::Telemetry {
                station: config.name.clone(),
                source,
            }
        })?;

        let mark = registers.len();
        let scheduling = |source| ModelError::Scheduling {
            station: config.name.clone(),
            source,
        };

        let mut ids = Vec::with_capacity(config.channels.len());
        for binding in &config.channels {
            match registers.declare(&binding.register, binding.kind) {
                Ok(id) => ids.push(id),
                Err(source) => {
                    registers.truncate(mark);
                    return Err(scheduling(source));
                }
            }
        }

        let batch: Vec<(Duration, Effect)> = samples
            .iter()
            .flat_map(|sample| {
                ids.iter().zip(&sample.payload).map(move |(id, value)| {
                    (
                        sample.offset,
                        Effect::SetValue {
                            cell: *id,
                            value: value.clone(),
                        },
                    )
                })
            })
            .collect();
        let effects = batch.len();

        if let Err(source) = host.defer_all(batch) {
            registers.truncate(mark);
            return Err(scheduling(source));
        }

        tracing::info!(
            "Station {}: {} records, {effects} effects deferred",
            config.name,
            samples.len()
        );

        Ok(Self {
            name: config.name.clone(),
            registers: config
                .channels
                .iter()
                .map(|binding| binding.register.clone())
                .zip(ids)
                .collect(),
            samples: samples.len(),
            effects,
            last_offset: samples.last().map(|sample| sample.offset),
        })
    }
}

/// Every station of a plan assembled into one simulation.
#[derive(Debug)]
pub struct PlanModel {
    epoch: DateTime<Utc>,
    stations: Vec<StationModel>,
    simulation: Simulation,
}

impl PlanModel {
    /// Builds all stations of `plan`; the simulation exists only if every station succeeds.
    ///
    /// # Errors
    ///
    /// - `ModelError::Config` - The plan fails validation
    /// - Any error from [`StationModel::build`]
    pub fn build(plan: &PlanConfig, opener: &dyn ResourceOpener) -> Result<Self, ModelError> {
        plan.validate()?;

        let resolver = DurationResolver::new(plan.epoch, plan.resolution);
        let mut registers = RegisterSet::new();
        let mut queue = DeferredEffectQueue::new();

        let stations = plan
            .stations
            .iter()
            .map(|station| {
                StationModel::build(station, &resolver, opener, &mut registers, &mut queue)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            "Plan ready: {} stations, {} registers, {} effects, epoch {}",
            stations.len(),
            registers.len(),
            queue.len(),
            plan.epoch
        );

        Ok(Self {
            epoch: plan.epoch,
            stations,
            simulation: Simulation::from_parts(registers, queue),
        })
    }

    /// Reads a plan file, applies runtime overrides and builds it against the
    /// plan's resource root, falling back to the runtime one.
    ///
    /// # Errors
    ///
    /// - `ModelError::Config` - The plan file could not be read or is invalid
    /// - Any error from [`PlanModel::build`]
    pub fn load(path: &Path, config: &TrackplayConfig) -> Result<Self, ModelError> {
        let mut plan = PlanConfig::from_file(path)?;
        config.apply_overrides(&mut plan);

        let root = plan
            .resource_root
            .clone()
            .unwrap_or_else(|| config.resource_root.clone());
        tracing::debug!("Resolving resources below {}", root.display());

        Self::build(&plan, &FileResources::new(root))
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn stations(&self) -> &[StationModel] {
        &self.stations
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn into_simulation(self) -> Simulation {
        self.simulation
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use trackplay_core::test_fixtures::{create_resource_root, elapsed_delta_text, view_period_product};
    use trackplay_core::{
        ClockResolution, InMemoryResources, RegisterValue, TelemetryFormat,
    };

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 8, 18, 0, 0, 0).unwrap()
    }

    fn resolver() -> DurationResolver {
        DurationResolver::new(epoch(), ClockResolution::Seconds)
    }

    fn station(name: &str, resource: &str, prefix: &str) -> StationConfig {
        StationConfig {
            name: name.to_string(),
            resource: resource.to_string(),
            format: TelemetryFormat::ElapsedDelta,
            channels: vec![
                ChannelBinding::real("azimuth", &format!("{prefix}_Azimuth")),
                ChannelBinding::real("elevation", &format!("{prefix}_Elevation")),
            ],
        }
    }

    fn plan(stations: Vec<StationConfig>) -> PlanConfig {
        PlanConfig {
            epoch: epoch(),
            resolution: ClockResolution::Seconds,
            resource_root: None,
            stations,
        }
    }

    #[test]
    fn test_cumulative_deltas_become_offsets() {
        let resources = InMemoryResources::new().with(
            "/az_el_DSS-13.txt",
            elapsed_delta_text(&[(10.0, 1.0, 2.0), (5.0, 3.0, 4.0), (20.0, 5.0, 6.0)]),
        );
        let mut registers = RegisterSet::new();
        let mut queue = DeferredEffectQueue::new();

        let model = StationModel::build(
            &station("DSS-13", "/az_el_DSS-13.txt", "/DSS_13"),
            &resolver(),
            &resources,
            &mut registers,
            &mut queue,
        )
        .unwrap();

        assert_eq!(model.samples, 3);
        assert_eq!(model.effects, 6);
        assert_eq!(model.last_offset, Some(Duration::from_secs(35)));

        let offsets: Vec<Duration> = queue
            .pop_ready(Duration::from_secs(60))
            .iter()
            .map(|s| s.offset)
            .collect();
        let expected: Vec<Duration> = [10, 10, 15, 15, 35, 35]
            .into_iter()
            .map(Duration::from_secs)
            .collect();
        assert_eq!(offsets, expected);
    }

    #[test]
    fn test_malformed_record_schedules_nothing() {
        let resources =
            InMemoryResources::new().with("/az_el_DSS-13.txt", "10 1.0 2.0\n5 abc 4.0\n");
        let mut registers = RegisterSet::new();
        let mut queue = DeferredEffectQueue::new();

        let result = StationModel::build(
            &station("DSS-13", "/az_el_DSS-13.txt", "/DSS_13"),
            &resolver(),
            &resources,
            &mut registers,
            &mut queue,
        );

        assert!(matches!(
            result,
            Err(ModelError::Telemetry {
                source: TelemetryError::MalformedRecord { line: 2, .. },
                ..
            })
        ));
        assert!(registers.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_missing_resource() {
        let resources = InMemoryResources::new();
        let result = PlanModel::build(
            &plan(vec![station("DSS-13", "/az_el_DSS-13.txt", "/DSS_13")]),
            &resources,
        );

        let error = result.unwrap_err();
        assert!(matches!(
            error,
            ModelError::Resource {
                source: ResourceError::NotFound { .. },
                ..
            }
        ));
        assert!(error.is_user_error());
        assert_eq!(
            error.user_message(),
            "Station DSS-13: Telemetry resource /az_el_DSS-13.txt not found"
        );
    }

    #[test]
    fn test_taken_register_rolls_back_declarations() {
        let resources = InMemoryResources::new().with("/a.txt", "10 1 2\n");
        let mut registers = RegisterSet::new();
        registers
            .declare("/DSS_13_Elevation", trackplay_core::ValueKind::Real)
            .unwrap();
        let mut queue = DeferredEffectQueue::new();

        let result = StationModel::build(
            &station("DSS-13", "/a.txt", "/DSS_13"),
            &resolver(),
            &resources,
            &mut registers,
            &mut queue,
        );

        assert!(matches!(
            result,
            Err(ModelError::Scheduling {
                source: SimulationError::DuplicateRegister { .. },
                ..
            })
        ));
        assert_eq!(registers.len(), 1);
        assert_eq!(registers.id("/DSS_13_Azimuth"), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sealed_host_rolls_back_declarations() {
        let resources = InMemoryResources::new().with("/a.txt", "10 1 2\n");
        let mut registers = RegisterSet::new();
        let mut queue = DeferredEffectQueue::new();
        queue.seal();

        let result = StationModel::build(
            &station("DSS-13", "/a.txt", "/DSS_13"),
            &resolver(),
            &resources,
            &mut registers,
            &mut queue,
        );

        assert!(matches!(
            result,
            Err(ModelError::Scheduling {
                source: SimulationError::SchedulingClosed { .. },
                ..
            })
        ));
        assert!(registers.is_empty());
    }

    #[test]
    fn test_plan_fails_when_any_station_fails() {
        let resources = InMemoryResources::new()
            .with("/dss13.txt", "10 1 2\n")
            .with("/dss14.txt", "10 1\n");

        let result = PlanModel::build(
            &plan(vec![
                station("DSS-13", "/dss13.txt", "/DSS_13"),
                station("DSS-14", "/dss14.txt", "/DSS_14"),
            ]),
            &resources,
        );

        assert!(matches!(
            result,
            Err(ModelError::Telemetry { ref station, .. }) if station == "DSS-14"
        ));
    }

    #[test]
    fn test_plan_runs_every_station() {
        let resources = InMemoryResources::new()
            .with("/dss13.txt", "3600 10.0 20.0\n3600 11.0 21.0\n")
            .with("/dss14.txt", "1800 100.0 5.0\n");

        let mut model = PlanModel::build(
            &plan(vec![
                station("DSS-13", "/dss13.txt", "/DSS_13"),
                station("DSS-14", "/dss14.txt", "/DSS_14"),
            ]),
            &resources,
        )
        .unwrap();
        assert_eq!(model.stations().len(), 2);

        let simulation = model.simulation_mut();
        simulation.execute_until(Duration::from_secs(3600)).unwrap();
        assert_eq!(
            simulation.read("/DSS_13_Azimuth").unwrap(),
            RegisterValue::Real(10.0)
        );
        assert_eq!(
            simulation.read("/DSS_14_Azimuth").unwrap(),
            RegisterValue::Real(100.0)
        );

        simulation.execute_to_completion().unwrap();
        assert_eq!(
            simulation.read("/DSS_13_Elevation").unwrap(),
            RegisterValue::Real(21.0)
        );
    }

    #[test]
    fn test_view_period_station_with_text_register() {
        let product = view_period_product(&[
            ("20 223/01:00:00", "RISE", 123.4, 10.5),
            ("20 223/02:00:00", "SET", 200.0, 10.0),
        ]);
        let resources = InMemoryResources::new().with("/dss14.vp", product);
        let plan = PlanConfig {
            epoch: Utc.with_ymd_and_hms(2020, 8, 10, 0, 0, 0).unwrap(),
            resolution: ClockResolution::Seconds,
            resource_root: None,
            stations: vec![StationConfig {
                name: "DSS-14".to_string(),
                resource: "/dss14.vp".to_string(),
                format: TelemetryFormat::ViewPeriod,
                channels: vec![
                    ChannelBinding::text("event", "/DSS_14_Event"),
                    ChannelBinding::real("azimuth", "/DSS_14_Azimuth"),
                ],
            }],
        };

        let mut simulation = PlanModel::build(&plan, &resources)
            .unwrap()
            .into_simulation();
        simulation.execute_until(Duration::from_secs(3600)).unwrap();

        assert_eq!(
            simulation.read("/DSS_14_Event").unwrap(),
            RegisterValue::Text("RISE".to_string())
        );
        assert_eq!(
            simulation.read("/DSS_14_Azimuth").unwrap(),
            RegisterValue::Real(123.4)
        );
    }

    #[test]
    fn test_load_from_plan_file() {
        let (temp_dir, _resources) = create_resource_root(&[(
            "telemetry/az_el_DSS-13.txt",
            "10 1.0 2.0\n5 3.0 4.0\n",
        )]);
        let mut plan = PlanConfig::dss13_default(epoch());
        plan.resource_root = Some("telemetry".into());
        let plan_path = temp_dir.path().join("plan.json");
        std::fs::write(&plan_path, serde_json::to_string(&plan).unwrap()).unwrap();

        let model = PlanModel::load(&plan_path, &TrackplayConfig::default()).unwrap();

        assert_eq!(model.epoch(), epoch());
        assert_eq!(model.stations()[0].samples, 2);
        assert_eq!(model.simulation().pending(), 4);
    }
}
