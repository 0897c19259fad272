//! Running statistics for one simulation run.

use serde::{Deserialize, Serialize};

/// Process-wide counters of a run, owned by the simulator and lent to field operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    /// Completed turns
    pub turns: u64,
    /// Trait mutations applied since the run started
    pub mutations: u64,
    /// Lowest antibiotic level among all known cell presets
    pub min_antibiotic: f64,
    /// Highest antibiotic level among all known cell presets
    pub max_antibiotic: f64,
}

impl SimulationStatistics {
    pub fn new() -> Self {
        Self {
            turns: 0,
            mutations: 0,
            min_antibiotic: f64::INFINITY,
            max_antibiotic: f64::NEG_INFINITY,
        }
    }

    pub fn record_turn(&mut self) {
        self.turns += 1;
    }

    pub fn record_mutation(&mut self) {
        self.mutations += 1;
    }

    /// Widen the tracked antibiotic range to include `level`
    pub fn observe_antibiotic(&mut self, level: f64) {
        self.min_antibiotic = self.min_antibiotic.min(level);
        self.max_antibiotic = self.max_antibiotic.max(level);
    }

    /// Map an antibiotic level into `[0, 1]` against the tracked range.
    ///
    /// Returns 0 while fewer than two distinct levels are known.
    pub fn normalize_antibiotic(&self, level: f64) -> f64 {
        let span = self.max_antibiotic - self.min_antibiotic;
        if !span.is_finite() || span <= 0.0 {
            return 0.0;
        }
        ((level - self.min_antibiotic) / span).clamp(0.0, 1.0)
    }
}

impl Default for SimulationStatistics {
    fn default() -> Self {
        Self::new()
    }
}
