//! Deterministic host engine driving deferred effects along virtual time.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use trackplay_core::{RegisterValue, ValueKind};

use super::clock::VirtualClock;
use super::effects::{Effect, EffectState};
use super::queue::{DeferredEffectQueue, ScheduledEffect};
use super::register::{RegisterId, RegisterSet, RegisterSnapshot};
use super::replay::{ReplayLog, ReplayOutcome, WriteRecord, replay};
use super::state::SimulationMetrics;

/// Errors that can occur while scheduling, firing or replaying effects.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Effect offered after the run started
    #[error("Scheduling is closed: effect for {offset:?} offered after the run started")]
    SchedulingClosed {
        /// Offset the rejected effect asked for
        offset: Duration,
    },

    /// Effect fired a second time within one run
    #[error("Effect #{seq} cannot fire: it is already {state}")]
    EffectAlreadyFired {
        /// Insertion sequence of the effect
        seq: u64,
        /// State the effect was in
        state: EffectState,
    },

    /// Effect asked to skip or repeat a lifecycle step
    #[error("Effect #{seq} cannot move from {from} to {to}")]
    InvalidEffectTransition {
        /// Insertion sequence of the effect
        seq: u64,
        /// Current state
        from: EffectState,
        /// Requested state
        to: EffectState,
    },

    /// Virtual clock asked to move into the past
    #[error("Virtual clock cannot move backwards from {from:?} to {to:?}")]
    ClockBackwards {
        /// Current offset
        from: Duration,
        /// Requested offset
        to: Duration,
    },

    /// Checkpoint requested beyond the current virtual time
    #[error("Checkpoint at {requested:?} is ahead of virtual time {now:?}")]
    CheckpointAhead {
        /// Requested checkpoint offset
        requested: Duration,
        /// Current virtual time
        now: Duration,
    },

    /// Register name or id not declared
    #[error("Unknown register: {register}")]
    UnknownRegister {
        /// Name or id that failed to resolve
        register: String,
    },

    /// Payload kind does not match the register kind
    #[error("Register {register} holds {expected} values, got {found}")]
    KindMismatch {
        /// Register name
        register: String,
        /// Declared kind
        expected: ValueKind,
        /// Kind of the offered value
        found: ValueKind,
    },

    /// Register name declared twice
    #[error("Register {name} is already declared")]
    DuplicateRegister {
        /// Conflicting name
        name: String,
    },
}

/// Scheduling primitive a model defers its effects through.
pub trait EffectHost {
    /// Asks the host to fire `effect` once virtual time reaches `offset`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::SchedulingClosed` - The run has already started
    fn defer(&mut self, offset: Duration, effect: Effect) -> Result<(), SimulationError>;

    /// Defers a batch of effects in order, all or none.
    ///
    /// # Errors
    ///
    /// - `SimulationError::SchedulingClosed` - The run has already started; nothing was deferred
    fn defer_all(&mut self, batch: Vec<(Duration, Effect)>) -> Result<(), SimulationError>;
}

/// Result of running the simulation up to some offset.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Virtual time reached
    pub now: Duration,
    /// Effects still queued
    pub pending: usize,
    /// Collected metrics
    pub metrics: SimulationMetrics,
    /// Register contents at `now`
    pub snapshot: RegisterSnapshot,
}

impl SimulationReport {
    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (t = {:?})\n", self.now));
        summary.push_str(&format!("Pending effects: {}\n", self.pending));
        summary.push_str(&self.metrics.summary());
        summary.push_str("\nRegisters:\n");

        for (name, value) in &self.snapshot.values {
            summary.push_str(&format!("  {name} = {value}\n"));
        }
        summary.push_str(&format!("State digest: {}\n", self.snapshot.digest));

        summary
    }
}

/// Outcome of replaying a run from the epoch at every fire offset.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayVerification {
    /// Number of cutoffs replayed
    pub checkpoints: usize,
    /// Cutoffs whose replayed write trace differed from the live one
    pub mismatched_offsets: Vec<Duration>,
    /// Digest of the live registers
    pub live_digest: String,
    /// Digest of the registers replayed up to the current virtual time
    pub replayed_digest: String,
}

impl ReplayVerification {
    pub fn is_consistent(&self) -> bool {
        self.mismatched_offsets.is_empty() && self.live_digest == self.replayed_digest
    }
}

/// Deterministic host for one plan.
///
/// Owns the virtual clock, the effect queue and the registers. Scheduling is
/// open until the first `execute_*` call; after that the queue is sealed and
/// effects only leave it.
#[derive(Debug, Default)]
pub struct Simulation {
    clock: VirtualClock,
    queue: DeferredEffectQueue,
    registers: RegisterSet,
    log: ReplayLog,
    writes: Vec<WriteRecord>,
    metrics: SimulationMetrics,
}

impl Simulation {
    /// Creates an empty simulation with no registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a simulation from a populated register set and queue.
    pub fn from_parts(registers: RegisterSet, queue: DeferredEffectQueue) -> Self {
        let mut metrics = SimulationMetrics::new();
        metrics.record_scheduled(queue.len());

        Self {
            clock: VirtualClock::new(),
            queue,
            registers,
            log: ReplayLog::new(),
            writes: Vec::new(),
            metrics,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    /// Declares a register before the run starts.
    ///
    /// # Errors
    ///
    /// - `SimulationError::DuplicateRegister` - A register with this name already exists
    pub fn declare_register(
        &mut self,
        name: &str,
        kind: ValueKind,
    ) -> Result<RegisterId, SimulationError> {
        self.registers.declare(name, kind)
    }

    /// Reads a register by its stable name.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownRegister` - No register has this name
    pub fn read(&self, name: &str) -> Result<RegisterValue, SimulationError> {
        self.registers.read_by_name(name)
    }

    pub fn replay_log(&self) -> &ReplayLog {
        &self.log
    }

    /// Every register write observed so far, in firing order.
    pub fn write_trace(&self) -> &[WriteRecord] {
        &self.writes
    }

    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Effects still waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Offset of the next queued effect, if any.
    pub fn next_fire_offset(&self) -> Option<Duration> {
        self.queue.peek_offset()
    }

    /// Fires every effect due by `target` and moves the clock to `target`.
    ///
    /// Effects fire one at a time. When one cannot be applied the call stops
    /// with the clock at the last fired offset and that effect, plus every
    /// later one, still queued.
    ///
    /// # Errors
    ///
    /// - `SimulationError::ClockBackwards` - `target` is earlier than the current virtual time
    /// - `SimulationError::UnknownRegister` - A fired effect targets an undeclared register
    /// - `SimulationError::KindMismatch` - A fired payload does not fit its register
    pub fn execute_until(&mut self, target: Duration) -> Result<SimulationReport, SimulationError> {
        if target < self.clock.now() {
            return Err(SimulationError::ClockBackwards {
                from: self.clock.now(),
                to: target,
            });
        }
        self.queue.seal();

        tracing::debug!(
            "Advancing {:?} -> {target:?}, {} effects queued",
            self.clock.now(),
            self.queue.len()
        );

        while let Some(next) = self.queue.peek_ready(target) {
            // An effect only leaves the queue once it is known to apply
            let effect = next.guard.effect();
            self.registers.check_write(effect.target(), effect.value())?;

            let Some(scheduled) = self.queue.pop_next() else {
                break;
            };
            self.clock.advance_to(scheduled.offset)?;
            self.fire(scheduled)?;
        }
        self.clock.advance_to(target)?;

        Ok(self.report())
    }

    /// Fires every queued effect.
    ///
    /// # Errors
    ///
    /// Same as [`Simulation::execute_until`].
    pub fn execute_to_completion(&mut self) -> Result<SimulationReport, SimulationError> {
        self.queue.seal();
        while let Some(next) = self.queue.peek_offset() {
            self.execute_until(next)?;
        }

        tracing::info!(
            "Simulation complete at {:?}: {} effects fired",
            self.clock.now(),
            self.metrics.effects_fired
        );
        Ok(self.report())
    }

    fn fire(&mut self, mut scheduled: ScheduledEffect) -> Result<(), SimulationError> {
        scheduled.guard.fire(&mut self.registers)?;
        let effect = scheduled.guard.consume()?;

        let register = self
            .registers
            .name(effect.target())
            .unwrap_or_default()
            .to_string();
        tracing::trace!(
            "t={:?} #{} {register} <- {}",
            scheduled.offset,
            scheduled.seq,
            effect.value()
        );

        self.metrics.record_fire(&register, scheduled.offset);
        self.writes.push(WriteRecord {
            offset: scheduled.offset,
            seq: scheduled.seq,
            register,
            value: effect.value().clone(),
        });
        self.log.record(scheduled.offset, scheduled.seq, effect);
        Ok(())
    }

    /// Reconstructs register contents at `at` by replaying from the epoch.
    ///
    /// # Errors
    ///
    /// - `SimulationError::CheckpointAhead` - `at` lies beyond the current virtual time
    pub fn checkpoint(&self, at: Duration) -> Result<ReplayOutcome, SimulationError> {
        if at > self.clock.now() {
            return Err(SimulationError::CheckpointAhead {
                requested: at,
                now: self.clock.now(),
            });
        }
        replay(&self.log, &self.registers, at)
    }

    /// Replays from the epoch at the epoch and at every distinct fire offset,
    /// comparing each replayed write trace with the live one, then compares
    /// the replayed and live register digests at the current virtual time.
    ///
    /// # Errors
    ///
    /// Any error raised while replaying; a divergence is reported in the result instead.
    pub fn verify_replay(&self) -> Result<ReplayVerification, SimulationError> {
        let mut cutoffs = vec![Duration::ZERO];
        cutoffs.extend(self.log.offsets().into_iter().filter(|o| *o > Duration::ZERO));

        let mut mismatched_offsets = Vec::new();
        for &cutoff in &cutoffs {
            let outcome = replay(&self.log, &self.registers, cutoff)?;
            let live: Vec<&WriteRecord> = self
                .writes
                .iter()
                .take_while(|w| w.offset <= cutoff)
                .collect();

            let same = live.len() == outcome.writes.len()
                && live
                    .iter()
                    .zip(&outcome.writes)
                    .all(|(live, replayed)| live.same_write(replayed));
            if !same {
                tracing::warn!("Replay diverged from the live run at {cutoff:?}");
                mismatched_offsets.push(cutoff);
            }
        }

        let replayed = replay(&self.log, &self.registers, self.clock.now())?;
        Ok(ReplayVerification {
            checkpoints: cutoffs.len(),
            mismatched_offsets,
            live_digest: self.registers.snapshot().digest,
            replayed_digest: replayed.registers.snapshot().digest,
        })
    }

    /// Generates a report of the current state.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            now: self.clock.now(),
            pending: self.queue.len(),
            metrics: self.metrics.clone(),
            snapshot: self.registers.snapshot(),
        }
    }
}

impl EffectHost for Simulation {
    fn defer(&mut self, offset: Duration, effect: Effect) -> Result<(), SimulationError> {
        self.registers.check_write(effect.target(), effect.value())?;
        self.queue.insert(offset, effect)?;
        self.metrics.record_scheduled(1);
        Ok(())
    }

    fn defer_all(&mut self, batch: Vec<(Duration, Effect)>) -> Result<(), SimulationError> {
        for (_, effect) in &batch {
            self.registers.check_write(effect.target(), effect.value())?;
        }
        let count = batch.len();
        self.queue.defer_all(batch)?;
        self.metrics.record_scheduled(count);
        Ok(())
    }
}
