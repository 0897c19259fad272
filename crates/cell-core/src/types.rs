//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity size, always in `(0, 1]`
pub type Size = f32;

/// 2D position on the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Apply toroidal wrapping for given field dimensions
    pub fn wrap(&self, width: i32, height: i32) -> Self {
        Self {
            x: ((self.x % width) + width) % width,
            y: ((self.y % height) + height) % height,
        }
    }

    /// Whether the position lies inside `[0, width) x [0, height)` without wrapping
    pub fn in_bounds(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }

    /// Squared Euclidean distance to another position
    pub fn distance_squared(&self, other: &Position) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction towards one of the eight neighbouring cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ]
    }
}

/// RGBA colour with channels in `[0, 1]`, used only for rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour with every channel clamped into `[0, 1]`
    pub fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(0.7, 0.9, 1.0, 1.0)
    }
}

/// Named resource preset applied to cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CellType {
    pub name: String,
    pub food_storage: f64,
    #[serde(alias = "Antibiotic")]
    pub antibiotic_level: f64,
}

impl CellType {
    pub const BASE_FOOD: f64 = 1000.0;
    pub const BASE_ANTIBIOTIC: f64 = 5.0;

    /// Preset used for the whole field when nothing else is configured
    pub fn base() -> Self {
        Self {
            name: "base".to_string(),
            food_storage: Self::BASE_FOOD,
            antibiotic_level: Self::BASE_ANTIBIOTIC,
        }
    }
}

impl Default for CellType {
    fn default() -> Self {
        Self::base()
    }
}

/// Named organism preset used to seed entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityType {
    pub name: String,
    pub consumption_base: f64,
    pub resistance: f64,
    #[serde(alias = "GrownRateBase")]
    pub growth_rate_base: f64,
    pub mutation_chance: f64,
}

impl EntityType {
    pub const BASE_CONSUMPTION: f64 = 5.0;
    pub const BASE_RESISTANCE: f64 = 10.0;
    pub const BASE_GROWTH_RATE: f64 = 0.2;
    pub const BASE_MUTATION_CHANCE: f64 = 0.01;
}

impl Default for EntityType {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            consumption_base: Self::BASE_CONSUMPTION,
            resistance: Self::BASE_RESISTANCE,
            growth_rate_base: Self::BASE_GROWTH_RATE,
            mutation_chance: Self::BASE_MUTATION_CHANCE,
        }
    }
}
