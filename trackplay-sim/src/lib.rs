//! Trackplay Simulation - Deterministic playback of recorded telemetry.

#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! This crate hosts register effects derived from telemetry on a virtual
//! clock. Every effect is known before the run starts, fires exactly once in
//! a stable order, and can be replayed from the epoch to rebuild register
//! state at any earlier offset.
//!
//! # Features
//!
//! - **Deferred Effects**: Pure `SetValue` effects keyed by `(offset, insertion sequence)`
//! - **Stable Ordering**: Same-offset effects fire in the order their records appeared
//! - **Replay**: Checkpoints are reconstructed from the epoch, never from memory snapshots
//! - **State Digests**: SHA-1 digests make register states cheap to compare
//! - **Explicit Models**: Plans are built from configuration, with no registration magic
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use chrono::{TimeZone, Utc};
//! use trackplay_core::{FileResources, PlanConfig};
//! use trackplay_sim::PlanModel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let epoch = Utc.with_ymd_and_hms(2023, 8, 18, 0, 0, 0).unwrap();
//! let plan = PlanConfig::dss13_default(epoch);
//!
//! let mut simulation = PlanModel::build(&plan, &FileResources::new("resources"))?
//!     .into_simulation();
//! simulation.execute_until(Duration::from_secs(3600))?;
//!
//! println!("Azimuth: {}", simulation.read("/DSS_13_Azimuth")?);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Deterministic Engine**: Virtual clock, effect queue and replay log
//! - **Registers**: Named cells written only by fired effects
//! - **Model Builder**: Turns a plan's stations into registers and deferred effects

pub mod deterministic;
pub mod model;

pub use deterministic::{
    DeferredEffectQueue, Effect, EffectHost, EffectState, ReplayGuard, ReplayLog, ReplayOutcome,
    ReplayVerification, RegisterCell, RegisterId, RegisterSet, RegisterSnapshot, Simulation,
    SimulationError, SimulationMetrics, SimulationReport, VirtualClock, WriteRecord, replay,
};
pub use model::{ModelError, PlanModel, StationModel};
