//! Time-ordered queue of deferred effects.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use super::effects::{Effect, ReplayGuard};
use super::simulation::{EffectHost, SimulationError};

/// An effect waiting in the queue.
#[derive(Debug, Clone)]
pub struct ScheduledEffect {
    /// Offset from the plan epoch at which the effect fires
    pub offset: Duration,
    /// Insertion sequence, assigned once at enqueue time
    pub seq: u64,
    pub guard: ReplayGuard,
}

impl Eq for ScheduledEffect {}

impl PartialEq for ScheduledEffect {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Ord for ScheduledEffect {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier offset first, then earlier insertion; reversed for min-heap behavior
        self.offset
            .cmp(&other.offset)
            .then_with(|| self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for ScheduledEffect {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered multiset of deferred effects keyed by `(offset, insertion sequence)`.
///
/// Insertion is only allowed before the run starts; [`DeferredEffectQueue::seal`]
/// closes it. Effects leave through [`DeferredEffectQueue::pop_ready`] and are
/// never reinserted.
#[derive(Debug, Default)]
pub struct DeferredEffectQueue {
    heap: BinaryHeap<ScheduledEffect>,
    next_seq: u64,
    sealed: bool,
}

impl DeferredEffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `effect` to fire at `offset` and returns its insertion sequence.
    ///
    /// # Errors
    ///
    /// - `SimulationError::SchedulingClosed` - The queue has been sealed
    pub fn insert(&mut self, offset: Duration, effect: Effect) -> Result<u64, SimulationError> {
        if self.sealed {
            return Err(SimulationError::SchedulingClosed { offset });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::trace!("Deferred effect #{seq} to {offset:?}");
        self.heap.push(ScheduledEffect {
            offset,
            seq,
            guard: ReplayGuard::new(seq, effect),
        });
        Ok(seq)
    }

    /// Removes and returns every effect with `offset <= now`, in firing order.
    ///
    /// An empty or not-yet-due queue yields an empty vector.
    pub fn pop_ready(&mut self, now: Duration) -> Vec<ScheduledEffect> {
        let mut ready = Vec::new();
        while self.heap.peek().is_some_and(|next| next.offset <= now) {
            if let Some(next) = self.heap.pop() {
                ready.push(next);
            }
        }
        ready
    }

    /// Next effect to fire, if it is due by `now`.
    pub fn peek_ready(&self, now: Duration) -> Option<&ScheduledEffect> {
        self.heap.peek().filter(|next| next.offset <= now)
    }

    /// Removes the next effect to fire regardless of its offset.
    pub fn pop_next(&mut self) -> Option<ScheduledEffect> {
        self.heap.pop()
    }

    /// Closes the queue to further insertion.
    pub fn seal(&mut self) {
        if !self.sealed {
            tracing::debug!("Effect queue sealed with {} pending", self.heap.len());
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Offset of the next effect to fire.
    pub fn peek_offset(&self) -> Option<Duration> {
        self.heap.peek().map(|next| next.offset)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Sequence the next inserted effect will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

impl EffectHost for DeferredEffectQueue {
    fn defer(&mut self, offset: Duration, effect: Effect) -> Result<(), SimulationError> {
        self.insert(offset, effect).map(|_| ())
    }

    fn defer_all(&mut self, batch: Vec<(Duration, Effect)>) -> Result<(), SimulationError> {
        if self.sealed {
            let offset = batch.first().map_or(Duration::ZERO, |(offset, _)| *offset);
            return Err(SimulationError::SchedulingClosed { offset });
        }
        for (offset, effect) in batch {
            self.insert(offset, effect)?;
        }
        Ok(())
    }
}
