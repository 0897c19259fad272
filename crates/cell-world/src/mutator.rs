//! Mutation operator for entity traits.

use cell_core::SimulationStatistics;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Smallest multiplier a mutation can apply
pub const MIN_MUTATION_FACTOR: f64 = 0.95;
/// Largest multiplier a mutation can apply
pub const MAX_MUTATION_FACTOR: f64 = 1.05;

/// Per-lineage mutation configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mutator {
    /// Probability that a single trait mutates when copied
    pub mutation_chance: f64,
}

impl Mutator {
    pub fn new(mutation_chance: f64) -> Self {
        Self { mutation_chance }
    }

    /// Return `value` unchanged, or scaled by a factor in `[0.95, 1.05]` with
    /// probability `mutation_chance`. Every applied mutation is counted.
    pub fn mutate(
        &self,
        value: f64,
        rng: &mut ChaCha8Rng,
        stats: &mut SimulationStatistics,
    ) -> f64 {
        if rng.gen::<f64>() < self.mutation_chance {
            stats.record_mutation();
            value * rng.gen_range(MIN_MUTATION_FACTOR..=MAX_MUTATION_FACTOR)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_zero_chance_never_mutates() {
        let mutator = Mutator::new(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut stats = SimulationStatistics::new();

        for _ in 0..1000 {
            assert_eq!(mutator.mutate(10.0, &mut rng, &mut stats), 10.0);
        }
        assert_eq!(stats.mutations, 0);
    }

    #[test]
    fn test_certain_mutation_stays_in_bounds() {
        let mutator = Mutator::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut stats = SimulationStatistics::new();

        for _ in 0..1000 {
            let value = mutator.mutate(10.0, &mut rng, &mut stats);
            assert!((9.5..=10.5).contains(&value), "value {} out of bounds", value);
        }
        assert_eq!(stats.mutations, 1000);
    }

    #[test]
    fn test_mutation_rate_is_respected() {
        let mutator = Mutator::new(0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut stats = SimulationStatistics::new();

        for _ in 0..10_000 {
            mutator.mutate(1.0, &mut rng, &mut stats);
        }
        assert!(stats.mutations > 800 && stats.mutations < 1200, "got {}", stats.mutations);
    }
}
