//! One toroidal buffer of cells.

use crate::cell::Cell;
use cell_core::{CellType, Direction, Position, SimulationStatistics};
use serde::{Deserialize, Serialize};

/// A 2D toroidal grid of cells, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell initialised from `preset`
    pub fn new(width: i32, height: i32, preset: &CellType, stats: &SimulationStatistics) -> Self {
        let size = (width * height) as usize;
        let mut cells = Vec::with_capacity(size);
        for index in 0..size {
            let pos = Position::new(index as i32 % width, index as i32 / width);
            cells.push(Cell::new(pos, preset, stats));
        }

        Self {
            width,
            height,
            cells,
        }
    }

    /// Get cell at position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> &Cell {
        let index = self.pos_to_index(pos.wrap(self.width, self.height));
        &self.cells[index]
    }

    /// Get mutable cell at position (with toroidal wrapping)
    pub fn get_mut(&mut self, pos: Position) -> &mut Cell {
        let index = self.pos_to_index(pos.wrap(self.width, self.height));
        &mut self.cells[index]
    }

    /// Distinct wrapped neighbours of a position, excluding the position itself.
    ///
    /// Fewer than eight are returned when the field is narrower than three cells.
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        let origin = pos.wrap(self.width, self.height);
        let mut neighbors: Vec<Position> = Vec::with_capacity(8);

        for direction in Direction::all() {
            let (dx, dy) = direction.to_delta();
            let neighbor = origin.add(dx, dy).wrap(self.width, self.height);
            if neighbor != origin && !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }

        neighbors
    }

    /// Regrow food on every cell
    pub fn replenish(&mut self, delta: f64) {
        for cell in &mut self.cells {
            cell.resources.replenish(delta);
        }
    }

    pub fn update_colors(&mut self, stats: &SimulationStatistics) {
        for cell in &mut self.cells {
            cell.update_color(stats);
        }
    }

    /// Number of cells holding an entity
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_occupied()).count()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    /// Iterator over all cells, row-major
    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }
}
