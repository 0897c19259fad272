//! Entity state and its per-turn lifecycle.

use crate::cell::Resources;
use crate::mutator::Mutator;
use cell_core::{Color, EntityType, SimulationStatistics, Size};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Size of a freshly created entity
pub const BASE_SIZE: Size = 0.1;
/// Size at which an entity divides
pub const MAX_SIZE: Size = 0.95;

/// Lifecycle of an entity within one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    Alive,
    /// Reached `MAX_SIZE`; the field divides it before the next turn
    DividePending,
    /// Starved or poisoned; the field removes it before the next turn
    Dead,
}

/// An organism occupying exactly one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    consumption_base: f64,
    resistance: f64,
    growth_rate_base: f64,
    mutator: Mutator,
    size: Size,
    color: Color,
    state: LifeState,
}

impl Entity {
    /// Create an unmutated entity from a preset
    pub fn from_type(preset: &EntityType) -> Self {
        Self::with_traits(
            preset.consumption_base,
            preset.resistance,
            preset.growth_rate_base,
            Mutator::new(preset.mutation_chance),
        )
    }

    fn with_traits(
        consumption_base: f64,
        resistance: f64,
        growth_rate_base: f64,
        mutator: Mutator,
    ) -> Self {
        let mut entity = Self {
            consumption_base,
            resistance,
            growth_rate_base,
            mutator,
            size: BASE_SIZE,
            color: Color::default(),
            state: LifeState::Alive,
        };
        entity.calculate_color();
        entity
    }

    /// Copy this entity's lineage into a new, fresh entity. Each trait passes
    /// through the lineage's mutator once.
    pub fn offspring(&self, rng: &mut ChaCha8Rng, stats: &mut SimulationStatistics) -> Self {
        let growth_rate_base = self.mutator.mutate(self.growth_rate_base, rng, stats);
        let resistance = self.mutator.mutate(self.resistance, rng, stats);
        let consumption_base = self.mutator.mutate(self.consumption_base, rng, stats);
        Self::with_traits(consumption_base, resistance, growth_rate_base, self.mutator)
    }

    /// Advance one turn against the resources of the owning cell.
    ///
    /// Vitality gates everything: a poisoned entity neither eats nor grows.
    /// Starvation is checked before growth is applied.
    pub fn update(&mut self, resources: &mut Resources) {
        if self.state != LifeState::Alive {
            return;
        }

        let vitality = (self.resistance - resources.bad_conditions) / self.resistance;
        // Zero resistance means no vitality, even without stress
        if self.resistance <= 0.0 || vitality <= 0.0 {
            self.state = LifeState::Dead;
            return;
        }

        let growth_rate = self.growth_rate_base * vitality + 1.0;
        let required = growth_rate * self.consumption_base;
        if resources.feed(required) < required {
            self.state = LifeState::Dead;
            return;
        }

        self.size = (self.size * growth_rate as Size).min(MAX_SIZE);
        if self.size >= MAX_SIZE {
            self.state = LifeState::DividePending;
        }

        self.calculate_color();
    }

    // Distance of every trait from the default preset, one channel each
    fn calculate_color(&mut self) {
        self.color = Color::opaque(
            (EntityType::BASE_CONSUMPTION - self.consumption_base).abs()
                / EntityType::BASE_CONSUMPTION,
            (EntityType::BASE_GROWTH_RATE - self.growth_rate_base).abs()
                / EntityType::BASE_GROWTH_RATE,
            (EntityType::BASE_RESISTANCE - self.resistance).abs() / EntityType::BASE_RESISTANCE,
        );
    }

    pub fn consumption_base(&self) -> f64 {
        self.consumption_base
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    pub fn growth_rate_base(&self) -> f64 {
        self.growth_rate_base
    }

    pub fn mutator(&self) -> Mutator {
        self.mutator
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn state(&self) -> LifeState {
        self.state
    }

    pub fn is_ready_to_divide(&self) -> bool {
        self.state == LifeState::DividePending
    }

    pub fn is_ready_to_death(&self) -> bool {
        self.state == LifeState::Dead
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::from_type(&EntityType::default())
    }
}
