//! Double-buffered toroidal field and the per-turn update.

use crate::entity::{Entity, LifeState};
use crate::grid::Grid;
use crate::snapshot::FieldSnapshot;
use cell_core::{CellType, EntityType, Error, Position, Result, SimulationStatistics};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// With this many free slots or fewer around a dividing entity, division fails
pub const CROWDED_FREE_SLOTS: usize = 3;
/// With at least this many free slots, a second offspring takes the origin cell
pub const SPARSE_FREE_SLOTS: usize = 5;

/// What happened during one turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnSummary {
    pub deaths: usize,
    pub divisions: usize,
    pub births: usize,
}

/// The simulated world: two grid buffers of equal size, one of them current.
///
/// Every update copies the current buffer into the other one, advances the
/// copy and then makes it current, so all entities of a turn observe the
/// same start-of-turn world.
pub struct CellField {
    buffers: [Grid; 2],
    active: usize,
    entity_count: usize,
    food_regen_per_turn: f64,
    rng: ChaCha8Rng,
}

impl CellField {
    /// Field covered by the default base preset
    pub fn new(width: i32, height: i32, stats: &mut SimulationStatistics, seed: u64) -> Result<Self> {
        Self::with_base_cell(width, height, &CellType::base(), stats, seed)
    }

    pub fn with_base_cell(
        width: i32,
        height: i32,
        base: &CellType,
        stats: &mut SimulationStatistics,
        seed: u64,
    ) -> Result<Self> {
        if width <= 0 || height <= 0 || width.checked_mul(height).is_none() {
            return Err(Error::InvalidConfig(format!(
                "field dimensions must be positive and bounded, got {}x{}",
                width, height
            )));
        }

        stats.observe_antibiotic(base.antibiotic_level);
        let grid = Grid::new(width, height, base, stats);

        Ok(Self {
            buffers: [grid.clone(), grid],
            active: 0,
            entity_count: 0,
            food_regen_per_turn: cell_core::SimulationConfig::default().food_regen_per_turn,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn width(&self) -> i32 {
        self.current().width
    }

    pub fn height(&self) -> i32 {
        self.current().height
    }

    /// Live entities after the last completed operation
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub fn set_food_regen(&mut self, delta: f64) {
        self.food_regen_per_turn = delta.max(0.0);
    }

    /// The buffer holding the latest completed turn
    pub fn current(&self) -> &Grid {
        &self.buffers[self.active]
    }

    fn current_mut(&mut self) -> &mut Grid {
        &mut self.buffers[self.active]
    }

    /// Install a mutated copy of `parent` at `pos`, replacing any occupant
    pub fn place_entity(
        &mut self,
        parent: &Entity,
        pos: Position,
        stats: &mut SimulationStatistics,
    ) -> Result<()> {
        self.check_origin(pos)?;
        let offspring = parent.offspring(&mut self.rng, stats);
        self.seed(pos, offspring);
        Ok(())
    }

    // Unmutated install into the current buffer
    fn seed(&mut self, pos: Position, entity: Entity) {
        if self.current_mut().get_mut(pos).set_entity(entity).is_none() {
            self.entity_count += 1;
        }
    }

    /// Advance every cell and entity by one turn
    pub fn update(&mut self, stats: &mut SimulationStatistics) -> TurnSummary {
        let [first, second] = &mut self.buffers;
        let (current, next) = if self.active == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };

        next.clone_from(current);
        next.replenish(self.food_regen_per_turn);

        // Only start-of-turn occupants act; offspring wait for the next turn
        let occupied: Vec<Position> = current
            .iter()
            .filter(|cell| cell.is_occupied())
            .map(|cell| cell.position())
            .collect();

        let mut summary = TurnSummary::default();
        for pos in occupied {
            let cell = next.get_mut(pos);
            cell.update_entity();

            match cell.entity().map(Entity::state) {
                Some(LifeState::Dead) => {
                    cell.kill();
                    summary.deaths += 1;
                }
                Some(LifeState::DividePending) => {
                    if let Some(parent) = cell.divide() {
                        summary.divisions += 1;
                        summary.births += divide(next, &parent, pos, &mut self.rng, stats);
                    }
                }
                _ => {}
            }
        }

        next.update_colors(stats);
        self.entity_count = self.entity_count + summary.births - summary.deaths - summary.divisions;
        debug_assert_eq!(self.entity_count, next.occupied_count());

        self.active = 1 - self.active;
        summary
    }

    /// Apply a cell preset to every cell of the disk of `radius` around
    /// `center`, wrapping across the edges. A negative radius affects nothing.
    pub fn drop_cell(
        &mut self,
        center: Position,
        radius: i32,
        preset: &CellType,
        stats: &mut SimulationStatistics,
    ) -> Result<usize> {
        self.check_origin(center)?;
        let positions = self.disk(center, radius);
        self.apply_cells(&positions, preset, stats);
        debug!(preset = %preset.name, center = %center, radius, cells = positions.len(), "Dropped cells");
        Ok(positions.len())
    }

    /// Seed an unmutated entity of `preset` on every cell within `radius` of `center`
    pub fn drop_entity(&mut self, center: Position, radius: i32, preset: &EntityType) -> Result<usize> {
        self.check_origin(center)?;
        let positions = self.disk(center, radius);
        self.seed_entities(&positions, preset);
        debug!(preset = %preset.name, center = %center, radius, cells = positions.len(), "Dropped entities");
        Ok(positions.len())
    }

    /// Apply a cell preset to a rectangle clamped to the field bounds
    pub fn drop_cell_rect(
        &mut self,
        origin: Position,
        width: i32,
        height: i32,
        preset: &CellType,
        stats: &mut SimulationStatistics,
    ) -> Result<usize> {
        self.check_origin(origin)?;
        let positions = self.rect(origin, width, height);
        self.apply_cells(&positions, preset, stats);
        debug!(preset = %preset.name, origin = %origin, width, height, cells = positions.len(), "Dropped cell rectangle");
        Ok(positions.len())
    }

    /// Seed unmutated entities on a rectangle clamped to the field bounds
    pub fn drop_entity_rect(
        &mut self,
        origin: Position,
        width: i32,
        height: i32,
        preset: &EntityType,
    ) -> Result<usize> {
        self.check_origin(origin)?;
        let positions = self.rect(origin, width, height);
        self.seed_entities(&positions, preset);
        debug!(preset = %preset.name, origin = %origin, width, height, cells = positions.len(), "Dropped entity rectangle");
        Ok(positions.len())
    }

    /// Detached render data of the current buffer
    pub fn make_snapshot(&self, stats: &SimulationStatistics) -> FieldSnapshot {
        FieldSnapshot::capture(self.current(), stats, self.entity_count)
    }

    fn apply_cells(&mut self, positions: &[Position], preset: &CellType, stats: &mut SimulationStatistics) {
        stats.observe_antibiotic(preset.antibiotic_level);
        let grid = self.current_mut();
        for pos in positions {
            grid.get_mut(*pos).apply_type(preset, stats);
        }
        // The antibiotic range may have widened, so every colour is stale
        grid.update_colors(stats);
    }

    fn seed_entities(&mut self, positions: &[Position], preset: &EntityType) {
        for pos in positions {
            self.seed(*pos, Entity::from_type(preset));
        }
    }

    fn check_origin(&self, pos: Position) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        if pos.in_bounds(width, height) {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                x: pos.x,
                y: pos.y,
                width,
                height,
            })
        }
    }

    /// Distinct wrapped positions whose Euclidean distance to `center`,
    /// rounded to the nearest cell, is at most `radius` (`d² <= r² + r`)
    fn disk(&self, center: Position, radius: i32) -> Vec<Position> {
        let (width, height) = (self.width() as i64, self.height() as i64);
        let radius = radius as i64;
        let limit = radius * (radius + 1);
        // Offsets past half the field reach a cell that a shorter offset already covers
        let reach_x = radius.min(width / 2);
        let reach_y = radius.min(height / 2);

        let mut covered = vec![false; (width * height) as usize];
        let mut positions = Vec::new();
        for dy in -reach_y..=reach_y {
            for dx in -reach_x..=reach_x {
                if dx * dx + dy * dy > limit {
                    continue;
                }
                let x = (center.x as i64 + dx).rem_euclid(width);
                let y = (center.y as i64 + dy).rem_euclid(height);
                let index = (y * width + x) as usize;
                if !covered[index] {
                    covered[index] = true;
                    positions.push(Position::new(x as i32, y as i32));
                }
            }
        }

        positions
    }

    fn rect(&self, origin: Position, width: i32, height: i32) -> Vec<Position> {
        let x_end = origin.x.saturating_add(width.max(0)).min(self.width());
        let y_end = origin.y.saturating_add(height.max(0)).min(self.height());

        (origin.y..y_end)
            .flat_map(|y| (origin.x..x_end).map(move |x| Position::new(x, y)))
            .collect()
    }
}

/// Place the offspring of a divided entity around `origin` in `next`.
///
/// Free slots are the unoccupied cells among the origin and its neighbours.
/// A crowded neighbourhood suppresses division entirely; a sparse one gets a
/// second offspring back on the origin. Returns the number of offspring placed.
fn divide(
    next: &mut Grid,
    parent: &Entity,
    origin: Position,
    rng: &mut ChaCha8Rng,
    stats: &mut SimulationStatistics,
) -> usize {
    let free: Vec<Position> = next
        .neighbors(origin)
        .into_iter()
        .filter(|pos| !next.get(*pos).is_occupied())
        .collect();
    let origin_free = !next.get(origin).is_occupied();
    let free_slots = free.len() + usize::from(origin_free);

    if free_slots <= CROWDED_FREE_SLOTS {
        trace!(origin = %origin, free_slots, "Division failed: neighbourhood crowded");
        return 0;
    }

    let Some(&target) = free.choose(rng) else {
        return 0;
    };
    next.get_mut(target).set_entity(parent.offspring(rng, stats));
    let mut born = 1;

    if origin_free && free_slots >= SPARSE_FREE_SLOTS {
        next.get_mut(origin).set_entity(parent.offspring(rng, stats));
        born += 1;
    }

    trace!(origin = %origin, target = %target, free_slots, born, "Entity divided");
    born
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BASE_SIZE, MAX_SIZE};
    use proptest::prelude::*;

    fn stable_type() -> EntityType {
        EntityType {
            name: "stable".to_string(),
            mutation_chance: 0.0,
            ..Default::default()
        }
    }

    fn field(width: i32, height: i32, stats: &mut SimulationStatistics) -> CellField {
        CellField::new(width, height, stats, 42).unwrap()
    }

    fn entity_at(field: &CellField, x: i32, y: i32) -> Option<&Entity> {
        field.current().get(Position::new(x, y)).entity()
    }

    #[test]
    fn test_field_creation() {
        let mut stats = SimulationStatistics::new();
        let field = field(10, 8, &mut stats);

        assert_eq!(field.width(), 10);
        assert_eq!(field.height(), 8);
        assert_eq!(field.entity_count(), 0);
        assert_eq!(stats.min_antibiotic, CellType::BASE_ANTIBIOTIC);
        assert!(CellField::new(0, 5, &mut stats, 0).is_err());
    }

    #[test]
    fn test_place_entity_resets_size_and_counts() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);
        let mut parent = Entity::from_type(&stable_type());
        parent.update(&mut field.current_mut().get_mut(Position::new(0, 0)).resources);
        assert!(parent.size() > BASE_SIZE);

        field.place_entity(&parent, Position::new(3, 4), &mut stats).unwrap();
        assert_eq!(field.entity_count(), 1);
        assert_eq!(entity_at(&field, 3, 4).unwrap().size(), BASE_SIZE);

        // Replacing an occupant keeps the count
        field.place_entity(&parent, Position::new(3, 4), &mut stats).unwrap();
        assert_eq!(field.entity_count(), 1);

        let result = field.place_entity(&parent, Position::new(10, 0), &mut stats);
        assert!(matches!(result, Err(Error::OutOfRange { x: 10, .. })));
    }

    #[test]
    fn test_poisoned_entity_dies_next_turn() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);
        let toxic = CellType {
            name: "toxic".to_string(),
            food_storage: 1000.0,
            antibiotic_level: 10.0,
        };
        field.drop_cell(Position::new(5, 5), 0, &toxic, &mut stats).unwrap();
        field.drop_entity(Position::new(5, 5), 0, &stable_type()).unwrap();
        assert_eq!(field.entity_count(), 1);

        let summary = field.update(&mut stats);

        assert_eq!(summary.deaths, 1);
        assert_eq!(field.entity_count(), 0);
        assert!(entity_at(&field, 5, 5).is_none());
        // Dying entities do not eat
        assert_eq!(field.current().get(Position::new(5, 5)).food_storage(), 1000.0);
    }

    #[test]
    fn test_update_does_not_touch_previous_buffer() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(6, 6, &mut stats);
        field.drop_entity(Position::new(2, 2), 0, &stable_type()).unwrap();
        let before = field.current().clone();

        field.update(&mut stats);

        assert_eq!(field.buffers[1 - field.active], before);
        assert!(entity_at(&field, 2, 2).unwrap().size() > BASE_SIZE);
    }

    #[test]
    fn test_growth_until_single_division() {
        let mut stats = SimulationStatistics::new();
        let base = CellType {
            name: "base".to_string(),
            food_storage: 1000.0,
            antibiotic_level: 5.0,
        };
        let mut field = CellField::with_base_cell(10, 10, &base, &mut stats, 7).unwrap();
        let seeded = EntityType {
            name: "seeded".to_string(),
            consumption_base: 5.0,
            resistance: 10.0,
            growth_rate_base: 0.2,
            mutation_chance: 0.01,
        };
        field.drop_entity(Position::new(5, 5), 0, &seeded).unwrap();

        let mut previous = BASE_SIZE;
        let mut divisions = 0;
        for _ in 0..100 {
            let summary = field.update(&mut stats);
            if summary.divisions > 0 {
                divisions += summary.divisions;
                assert_eq!(summary.births, 2);
                break;
            }
            let size = entity_at(&field, 5, 5).unwrap().size();
            assert!(size > previous && size < MAX_SIZE);
            previous = size;
        }

        assert_eq!(divisions, 1);
        assert_eq!(field.entity_count(), 2);
        assert_eq!(field.current().occupied_count(), 2);
        assert!(entity_at(&field, 5, 5).is_some());
    }

    #[test]
    fn test_division_fails_when_surrounded() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(3, 3, &mut stats);
        field.drop_entity_rect(Position::new(0, 0), 3, 3, &stable_type()).unwrap();
        assert_eq!(field.entity_count(), 9);

        // Divide the centre by hand against a fully occupied neighbourhood
        let next = &mut field.buffers[field.active];
        let parent = next.get_mut(Position::new(1, 1)).divide().unwrap();
        let born = divide(next, &parent, Position::new(1, 1), &mut field.rng, &mut stats);

        assert_eq!(born, 0);
        assert!(!field.current().get(Position::new(1, 1)).is_occupied());
        assert_eq!(field.current().occupied_count(), 8);
    }

    #[test]
    fn test_division_throttle() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);
        let origin = Position::new(5, 5);
        let parent = Entity::from_type(&stable_type());

        // Four free neighbours plus the origin: two offspring
        field.drop_entity_rect(Position::new(4, 4), 3, 1, &stable_type()).unwrap();
        field.drop_entity(Position::new(4, 5), 0, &stable_type()).unwrap();
        let grid = &mut field.buffers[field.active];
        assert_eq!(divide(grid, &parent, origin, &mut field.rng, &mut stats), 2);

        // Three free neighbours plus the origin: one offspring, origin stays empty
        let mut field = self::field(10, 10, &mut stats);
        field.drop_entity_rect(Position::new(4, 4), 3, 1, &stable_type()).unwrap();
        field.drop_entity_rect(Position::new(4, 5), 1, 2, &stable_type()).unwrap();
        let grid = &mut field.buffers[field.active];
        assert_eq!(divide(grid, &parent, origin, &mut field.rng, &mut stats), 1);
        assert!(!grid.get(origin).is_occupied());

        // Two free neighbours plus the origin: crowded
        let mut field = self::field(10, 10, &mut stats);
        field.drop_entity_rect(Position::new(4, 4), 3, 1, &stable_type()).unwrap();
        field.drop_entity_rect(Position::new(4, 5), 1, 2, &stable_type()).unwrap();
        field.drop_entity(Position::new(5, 6), 0, &stable_type()).unwrap();
        let grid = &mut field.buffers[field.active];
        assert_eq!(divide(grid, &parent, origin, &mut field.rng, &mut stats), 0);
    }

    #[test]
    fn test_drop_wraps_across_edges() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);
        let rich = CellType {
            name: "rich".to_string(),
            food_storage: 5000.0,
            antibiotic_level: 1.0,
        };

        let affected = field.drop_cell(Position::new(0, 0), 1, &rich, &mut stats).unwrap();

        assert_eq!(affected, 9);
        assert_eq!(field.current().get(Position::new(9, 9)).max_food(), 5000.0);
        assert_eq!(field.current().get(Position::new(9, 0)).max_food(), 5000.0);
        assert_eq!(field.current().get(Position::new(1, 9)).max_food(), 5000.0);
        assert_eq!(field.current().get(Position::new(2, 0)).max_food(), CellType::BASE_FOOD);
        assert_eq!(stats.min_antibiotic, 1.0);
    }

    #[test]
    fn test_disk_shape() {
        let mut stats = SimulationStatistics::new();
        let field = field(20, 20, &mut stats);

        assert_eq!(field.disk(Position::new(10, 10), 0).len(), 1);
        assert_eq!(field.disk(Position::new(10, 10), 1).len(), 9);
        // Corners of the bounding square fall outside
        let disk = field.disk(Position::new(10, 10), 2);
        assert_eq!(disk.len(), 21);
        assert!(!disk.contains(&Position::new(12, 12)));
        assert!(disk.contains(&Position::new(12, 11)));
        assert_eq!(field.disk(Position::new(10, 10), 3).len(), 37);
        assert!(field.disk(Position::new(10, 10), -1).is_empty());
        // Huge radii cover each cell once
        assert_eq!(field.disk(Position::new(0, 0), 50).len(), 400);
    }

    #[test]
    fn test_huge_radius_drop_covers_field_once() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);

        let seeded = field
            .drop_entity(Position::new(5, 5), i32::MAX, &EntityType::default())
            .unwrap();
        assert_eq!(seeded, 100);
        assert_eq!(field.entity_count(), 100);

        let affected = field
            .drop_cell(Position::new(0, 9), i32::MAX, &CellType::base(), &mut stats)
            .unwrap();
        assert_eq!(affected, 100);

        // Odd sizes have no shared half-way offset
        let mut narrow = CellField::new(7, 3, &mut stats, 1).unwrap();
        assert_eq!(
            narrow.drop_entity(Position::new(6, 2), 2000, &stable_type()).unwrap(),
            21
        );
    }

    #[test]
    fn test_oversized_field_is_rejected() {
        let mut stats = SimulationStatistics::new();
        assert!(matches!(
            CellField::new(70_000, 70_000, &mut stats, 0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rect_is_clamped() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);

        let seeded = field
            .drop_entity_rect(Position::new(8, 7), 5, 5, &stable_type())
            .unwrap();

        assert_eq!(seeded, 6);
        assert_eq!(field.entity_count(), 6);
        assert!(entity_at(&field, 9, 9).is_some());
        assert!(entity_at(&field, 0, 0).is_none());
        assert_eq!(field.drop_entity_rect(Position::new(1, 1), -3, 2, &stable_type()).unwrap(), 0);

        let row = field
            .drop_entity_rect(Position::new(2, 0), i32::MAX, 1, &stable_type())
            .unwrap();
        assert_eq!(row, 8);
        let block = field
            .drop_cell_rect(Position::new(9, 9), i32::MAX, i32::MAX, &CellType::base(), &mut stats)
            .unwrap();
        assert_eq!(block, 1);
    }

    #[test]
    fn test_drop_rejects_out_of_range_origin() {
        let mut stats = SimulationStatistics::new();
        let mut field = field(10, 10, &mut stats);

        assert!(field.drop_cell(Position::new(-1, 0), 1, &CellType::base(), &mut stats).is_err());
        assert!(field.drop_entity(Position::new(0, 10), 1, &stable_type()).is_err());
        assert!(field
            .drop_cell_rect(Position::new(10, 10), 1, 1, &CellType::base(), &mut stats)
            .is_err());
        assert!(field.drop_entity_rect(Position::new(3, -2), 1, 1, &stable_type()).is_err());
        assert_eq!(field.entity_count(), 0);
    }

    #[test]
    fn test_food_stays_in_bounds_while_starving() {
        let mut stats = SimulationStatistics::new();
        let poor = CellType {
            name: "poor".to_string(),
            food_storage: 20.0,
            antibiotic_level: 5.0,
        };
        let mut field = CellField::with_base_cell(5, 5, &poor, &mut stats, 3).unwrap();
        field.set_food_regen(0.5);
        field.drop_entity_rect(Position::new(0, 0), 5, 5, &stable_type()).unwrap();

        for _ in 0..10 {
            field.update(&mut stats);
            for cell in field.current().iter() {
                assert!(cell.food_storage() >= 0.0);
                assert!(cell.food_storage() <= cell.max_food());
            }
        }
        assert_eq!(field.entity_count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_entity_count_matches_occupancy(
            seed in any::<u64>(),
            drops in proptest::collection::vec((0..12i32, 0..12i32, 0..3i32), 1..6),
            turns in 1..60usize,
        ) {
            let mut stats = SimulationStatistics::new();
            let mut field = CellField::new(12, 12, &mut stats, seed).unwrap();
            let preset = EntityType { mutation_chance: 0.2, ..Default::default() };
            for (x, y, r) in drops {
                field.drop_entity(Position::new(x, y), r, &preset).unwrap();
            }
            prop_assert_eq!(field.entity_count(), field.current().occupied_count());

            for _ in 0..turns {
                field.update(&mut stats);
                prop_assert_eq!(field.entity_count(), field.current().occupied_count());
                for cell in field.current().iter() {
                    prop_assert!(cell.food_storage() >= 0.0);
                    prop_assert!(cell.food_storage() <= cell.max_food());
                    if let Some(entity) = cell.entity() {
                        prop_assert!(entity.size() > 0.0 && entity.size() <= MAX_SIZE);
                        prop_assert_eq!(entity.state(), LifeState::Alive);
                    }
                }
            }
        }
    }
}
