//! Render-ready copies of the field.
//!
//! A snapshot owns all of its data, so a renderer may keep it for as long as
//! it likes while the simulation moves on.

use crate::grid::Grid;
use cell_core::{Color, Position, SimulationStatistics, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub size: Size,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub back_color: Color,
    pub entity: Option<EntityView>,
}

/// Visual state of the whole field plus run counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub width: i32,
    pub height: i32,
    /// Row-major cell views
    pub cells: Vec<CellView>,
    pub turns: u64,
    pub mutations: u64,
    pub entities: usize,
}

impl FieldSnapshot {
    pub fn capture(grid: &Grid, stats: &SimulationStatistics, entities: usize) -> Self {
        let cells = grid
            .iter()
            .map(|cell| CellView {
                back_color: cell.color(),
                entity: cell.entity().map(|entity| EntityView {
                    size: entity.size(),
                    color: entity.color(),
                }),
            })
            .collect();

        Self {
            width: grid.width,
            height: grid.height,
            cells,
            turns: stats.turns,
            mutations: stats.mutations,
            entities,
        }
    }

    /// View of the cell at `pos`, if it lies inside the field
    pub fn cell(&self, pos: Position) -> Option<&CellView> {
        if !pos.in_bounds(self.width, self.height) {
            return None;
        }
        self.cells.get((pos.y * self.width + pos.x) as usize)
    }

    /// Iterator over the rows of the field, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[CellView]> + '_ {
        self.cells.chunks(self.width.max(1) as usize)
    }
}
