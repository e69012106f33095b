//! Replay log and state reconstruction from the epoch.
//!
//! State at a checkpoint is never restored from a memory snapshot. It is
//! rebuilt by re-firing the logged effects, in their original order, against
//! a register set reset to defaults.

use std::time::Duration;

use serde::Serialize;
use trackplay_core::RegisterValue;

use super::effects::{Effect, ReplayGuard};
use super::register::RegisterSet;
use super::simulation::SimulationError;

/// One observed register write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteRecord {
    /// Offset from the epoch at which the write happened
    pub offset: Duration,
    /// Insertion sequence of the effect that wrote
    pub seq: u64,
    pub register: String,
    pub value: RegisterValue,
}

impl WriteRecord {
    /// Bit-exact comparison of two writes.
    pub fn same_write(&self, other: &Self) -> bool {
        self.offset == other.offset
            && self.seq == other.seq
            && self.register == other.register
            && self.value.same_bits(&other.value)
    }
}

/// A fired effect as recorded for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEffect {
    pub offset: Duration,
    pub seq: u64,
    pub effect: Effect,
}

/// Effects in the order they fired during a run.
#[derive(Debug, Clone, Default)]
pub struct ReplayLog {
    entries: Vec<LoggedEffect>,
}

impl ReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a consumed effect.
    pub fn record(&mut self, offset: Duration, seq: u64, effect: Effect) {
        self.entries.push(LoggedEffect {
            offset,
            seq,
            effect,
        });
    }

    pub fn entries(&self) -> &[LoggedEffect] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct fire offsets, ascending.
    pub fn offsets(&self) -> Vec<Duration> {
        let mut offsets: Vec<Duration> = self.entries.iter().map(|e| e.offset).collect();
        offsets.dedup();
        offsets
    }

    pub fn last_offset(&self) -> Option<Duration> {
        self.entries.last().map(|e| e.offset)
    }
}

/// Registers and write trace reconstructed up to a cutoff.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub cutoff: Duration,
    pub registers: RegisterSet,
    pub writes: Vec<WriteRecord>,
}

/// Re-fires every logged effect with `offset <= cutoff` against a copy of
/// `registers` reset to defaults.
///
/// # Errors
///
/// - `SimulationError::UnknownRegister` - A logged effect targets a register missing from `registers`
/// - `SimulationError::KindMismatch` - A logged payload does not fit its register
pub fn replay(
    log: &ReplayLog,
    registers: &RegisterSet,
    cutoff: Duration,
) -> Result<ReplayOutcome, SimulationError> {
    let mut fresh = registers.cleared();
    let mut writes = Vec::new();

    for entry in log.entries().iter().take_while(|e| e.offset <= cutoff) {
        let mut guard = ReplayGuard::new(entry.seq, entry.effect.clone());
        guard.fire(&mut fresh)?;
        let effect = guard.consume()?;

        let target = effect.target();
        writes.push(WriteRecord {
            offset: entry.offset,
            seq: entry.seq,
            register: fresh.name(target).unwrap_or_default().to_string(),
            value: effect.value().clone(),
        });
    }

    tracing::debug!(
        "Replayed {} of {} logged effects up to {cutoff:?}",
        writes.len(),
        log.len()
    );

    Ok(ReplayOutcome {
        cutoff,
        registers: fresh,
        writes,
    })
}
