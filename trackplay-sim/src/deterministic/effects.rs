//! Deferred effects and their replay guard.

use std::fmt;

use trackplay_core::RegisterValue;

use super::register::{RegisterId, RegisterSet};
use super::simulation::SimulationError;

/// A register mutation scheduled for a virtual-time offset.
///
/// Effects own their payload outright. Applying one reads nothing but that
/// payload and performs no I/O, so replaying the same sequence from the epoch
/// always reproduces the same register contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Overwrites `cell` with `value`
    SetValue {
        cell: RegisterId,
        value: RegisterValue,
    },
}

impl Effect {
    pub fn set_value(cell: RegisterId, value: impl Into<RegisterValue>) -> Self {
        Effect::SetValue {
            cell,
            value: value.into(),
        }
    }

    /// Register the effect writes.
    pub fn target(&self) -> RegisterId {
        match self {
            Effect::SetValue { cell, .. } => *cell,
        }
    }

    /// Value the effect writes.
    pub fn value(&self) -> &RegisterValue {
        match self {
            Effect::SetValue { value, .. } => value,
        }
    }

    /// Applies the effect to `registers`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownRegister` - Target was not declared in `registers`
    /// - `SimulationError::KindMismatch` - Payload kind differs from the register kind
    pub fn apply(&self, registers: &mut RegisterSet) -> Result<(), SimulationError> {
        match self {
            Effect::SetValue { cell, value } => registers.write(*cell, value.clone()),
        }
    }
}

/// Lifecycle of a scheduled effect within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Pending,
    Fired,
    Consumed,
}

impl fmt::Display for EffectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectState::Pending => write!(f, "pending"),
            EffectState::Fired => write!(f, "fired"),
            EffectState::Consumed => write!(f, "consumed"),
        }
    }
}

/// Enforces fire-once semantics for one effect in one run.
///
/// Moves `Pending -> Fired -> Consumed` and never back. Replays build fresh
/// guards from the logged effects instead of rewinding old ones.
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    seq: u64,
    effect: Effect,
    state: EffectState,
}

impl ReplayGuard {
    /// Wraps `effect`, scheduled with insertion sequence `seq`.
    pub fn new(seq: u64, effect: Effect) -> Self {
        Self {
            seq,
            effect,
            state: EffectState::Pending,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Applies the wrapped effect.
    ///
    /// # Errors
    ///
    /// - `SimulationError::EffectAlreadyFired` - The guard is not pending
    /// - Any error from [`Effect::apply`]; the guard stays pending in that case
    pub fn fire(&mut self, registers: &mut RegisterSet) -> Result<(), SimulationError> {
        if self.state != EffectState::Pending {
            return Err(SimulationError::EffectAlreadyFired {
                seq: self.seq,
                state: self.state,
            });
        }

        self.effect.apply(registers)?;
        self.state = EffectState::Fired;
        Ok(())
    }

    /// Retires a fired effect, handing it over for the replay log.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidEffectTransition` - The guard has not fired, or was already consumed
    pub fn consume(&mut self) -> Result<Effect, SimulationError> {
        if self.state != EffectState::Fired {
            return Err(SimulationError::InvalidEffectTransition {
                seq: self.seq,
                from: self.state,
                to: EffectState::Consumed,
            });
        }

        self.state = EffectState::Consumed;
        Ok(self.effect.clone())
    }
}
