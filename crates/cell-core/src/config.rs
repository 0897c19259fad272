//! Configuration types for the simulation.

use crate::{CellType, EntityType, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Turn clock and engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Delay between two turn ticks (milliseconds)
    pub turn_delay_ms: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Food every cell regains per turn, capped at its maximum
    pub food_regen_per_turn: f64,
    /// Turns between two population summaries in the log
    pub summary_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: 50, // 20 turns per second
            seed: 0,
            food_regen_per_turn: 1.0,
            summary_interval: 100,
        }
    }
}

/// Disk-shaped drop of a named preset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PointDrop {
    pub type_name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub r: i32,
}

/// Rectangle-shaped drop of a named preset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RectDrop {
    pub type_name: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Declarative description of the initial field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FieldLayout {
    pub cell_types: Vec<CellType>,
    pub entity_types: Vec<EntityType>,
    pub width: i32,
    pub height: i32,
    /// Name of the cell preset covering the whole field before any drop
    pub base_cell_type: String,
    pub cell_drops: Vec<PointDrop>,
    pub entity_drops: Vec<PointDrop>,
    pub cell_rects: Vec<RectDrop>,
    pub entity_rects: Vec<RectDrop>,
}

impl FieldLayout {
    pub const DEFAULT_WIDTH: i32 = 40;
    pub const DEFAULT_HEIGHT: i32 = 40;

    pub fn from_json(json: &str) -> Result<Self> {
        let layout: FieldLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Reading field layout");
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Dimensions must describe a non-empty field
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 || self.width.checked_mul(self.height).is_none() {
            return Err(Error::InvalidConfig(format!(
                "field dimensions must be positive and bounded, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn cell_type(&self, name: &str) -> Option<&CellType> {
        self.cell_types.iter().find(|t| t.name == name)
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.iter().find(|t| t.name == name)
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            cell_types: Vec::new(),
            entity_types: Vec::new(),
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            base_cell_type: String::new(),
            cell_drops: Vec::new(),
            entity_drops: Vec::new(),
            cell_rects: Vec::new(),
            entity_rects: Vec::new(),
        }
    }
}
