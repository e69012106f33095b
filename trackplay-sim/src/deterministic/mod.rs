//! Deterministic host for deferred register effects.
//!
//! Effects are scheduled against a virtual clock before the run starts, fire
//! in `(offset, insertion sequence)` order, and can be replayed from the epoch
//! to reconstruct register state at any earlier offset.

mod clock;
mod effects;
mod queue;
mod register;
mod replay;
mod simulation;
mod state;

// Re-export core types for public API
pub use clock::VirtualClock;
pub use effects::{Effect, EffectState, ReplayGuard};
pub use queue::{DeferredEffectQueue, ScheduledEffect};
pub use register::{RegisterCell, RegisterId, RegisterSet, RegisterSnapshot};
pub use replay::{LoggedEffect, ReplayLog, ReplayOutcome, WriteRecord, replay};
pub use simulation::{
    EffectHost, ReplayVerification, Simulation, SimulationError, SimulationReport,
};
pub use state::SimulationMetrics;
