//! A single grid slot: its resources and at most one entity.

use crate::entity::Entity;
use cell_core::{CellType, Color, Position, SimulationStatistics};
use serde::{Deserialize, Serialize};

/// Food and environmental stress of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// Food available to the occupant, always in `[0, max_food]`
    pub food_storage: f64,
    pub max_food: f64,
    /// Antibiotic-like stress level
    pub bad_conditions: f64,
}

impl Resources {
    pub fn from_type(preset: &CellType) -> Self {
        let food = preset.food_storage.max(0.0);
        Self {
            food_storage: food,
            max_food: food,
            bad_conditions: preset.antibiotic_level.max(0.0),
        }
    }

    /// Hand out up to `amount` food; the returned amount is what was actually granted
    pub fn feed(&mut self, amount: f64) -> f64 {
        let granted = amount.max(0.0).min(self.food_storage);
        self.food_storage -= granted;
        granted
    }

    /// Regrow food towards `max_food`
    pub fn replenish(&mut self, delta: f64) {
        self.food_storage = (self.food_storage + delta).min(self.max_food);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    position: Position,
    pub resources: Resources,
    color: Color,
    entity: Option<Entity>,
}

impl Cell {
    pub fn new(position: Position, preset: &CellType, stats: &SimulationStatistics) -> Self {
        let mut cell = Self {
            position,
            resources: Resources::from_type(preset),
            color: Color::default(),
            entity: None,
        };
        cell.update_color(stats);
        cell
    }

    /// Overwrite the resources with a preset
    pub fn apply_type(&mut self, preset: &CellType, stats: &SimulationStatistics) {
        self.resources = Resources::from_type(preset);
        self.update_color(stats);
    }

    pub fn feed(&mut self, amount: f64) -> f64 {
        self.resources.feed(amount)
    }

    /// Remove the occupant, if any
    pub fn kill(&mut self) -> Option<Entity> {
        self.entity.take()
    }

    /// Extract the occupant for division, leaving the cell empty. The field
    /// places the offspring, this cell only gives up ownership.
    pub fn divide(&mut self) -> Option<Entity> {
        self.entity.take()
    }

    /// Install `entity`, returning the previous occupant
    pub fn set_entity(&mut self, entity: Entity) -> Option<Entity> {
        self.entity.replace(entity)
    }

    /// Run the occupant's turn against this cell's resources
    pub(crate) fn update_entity(&mut self) {
        if let Some(entity) = self.entity.as_mut() {
            entity.update(&mut self.resources);
        }
    }

    pub fn update_color(&mut self, stats: &SimulationStatistics) {
        let food = if self.resources.max_food > 0.0 {
            self.resources.food_storage / self.resources.max_food
        } else {
            0.0
        };
        self.color = Color::opaque(
            stats.normalize_antibiotic(self.resources.bad_conditions),
            food,
            0.0,
        );
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.entity.is_some()
    }

    pub fn food_storage(&self) -> f64 {
        self.resources.food_storage
    }

    pub fn max_food(&self) -> f64 {
        self.resources.max_food
    }

    pub fn bad_conditions(&self) -> f64 {
        self.resources.bad_conditions
    }
}
