//! Metrics collected while effects fire.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Metrics collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationMetrics {
    /// Effects accepted by the host
    pub effects_scheduled: u64,
    /// Effects fired so far
    pub effects_fired: u64,
    /// Writes per register name
    pub writes_by_register: BTreeMap<String, u64>,
    /// Offset of the most recent fire
    pub last_fire_offset: Option<Duration>,
}

impl SimulationMetrics {
    /// Creates new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records effects accepted for scheduling.
    pub fn record_scheduled(&mut self, count: usize) {
        self.effects_scheduled += count as u64;
    }

    /// Records one fired effect.
    pub fn record_fire(&mut self, register: &str, offset: Duration) {
        self.effects_fired += 1;
        *self
            .writes_by_register
            .entry(register.to_string())
            .or_insert(0) += 1;
        self.last_fire_offset = Some(offset);
    }

    /// Effects scheduled but not yet fired.
    pub fn effects_pending(&self) -> u64 {
        self.effects_scheduled.saturating_sub(self.effects_fired)
    }

    /// Generates summary statistics.
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Effects scheduled: {}\n", self.effects_scheduled));
        summary.push_str(&format!("Effects fired: {}\n", self.effects_fired));
        summary.push_str(&format!(
            "Last fire offset: {}\n",
            self.last_fire_offset
                .map_or_else(|| "none".to_string(), |offset| format!("{offset:?}"))
        ));
        for (register, count) in &self.writes_by_register {
            summary.push_str(&format!("  {register}: {count} writes\n"));
        }

        summary
    }
}
