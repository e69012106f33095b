//! Virtual time for deterministic playback.

use std::time::Duration;

use super::simulation::SimulationError;

/// Virtual clock measured as an offset from the plan epoch.
///
/// Time only moves forward and is independent of wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now: Duration,
}

impl VirtualClock {
    /// Creates a clock positioned at the epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current offset from the epoch.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Returns true once the clock has moved past the epoch.
    pub fn has_departed(&self) -> bool {
        self.now > Duration::ZERO
    }

    /// Moves the clock to `target`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::ClockBackwards` - If `target` is earlier than the current offset
    pub fn advance_to(&mut self, target: Duration) -> Result<(), SimulationError> {
        if target < self.now {
            return Err(SimulationError::ClockBackwards {
                from: self.now,
                to: target,
            });
        }
        self.now = target;
        Ok(())
    }

    /// Returns the clock to the epoch.
    pub fn reset(&mut self) {
        self.now = Duration::ZERO;
    }
}
