//! Colony simulation engine.
//!
//! A toroidal field of resource cells, each holding at most one entity that
//! grows, feeds, divides or dies once per turn. The [`Simulator`] drives turns
//! on a clock and hands render-ready snapshots to an observer without ever
//! waiting for it.

pub mod cell;
pub mod entity;
pub mod field;
pub mod grid;
pub mod layout;
pub mod mutator;
pub mod simulator;
pub mod snapshot;

pub use cell::Cell;
pub use entity::Entity;
pub use field::CellField;
pub use grid::Grid;
pub use layout::build_field;
pub use mutator::Mutator;
pub use simulator::{Simulator, SnapshotReceiver};
pub use snapshot::FieldSnapshot;
