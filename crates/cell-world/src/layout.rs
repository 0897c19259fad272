//! Builds a field from a declarative layout.

use crate::field::CellField;
use cell_core::{CellType, Error, FieldLayout, Position, Result, SimulationStatistics};
use tracing::{info, instrument, warn};

/// Create the field described by `layout`.
///
/// Every cell preset widens the antibiotic range of `stats`, then the base
/// preset covers the field and the drops are applied in order: cell disks,
/// entity disks, cell rectangles, entity rectangles. A drop naming an unknown
/// preset or starting outside the field is logged and skipped.
#[instrument(skip_all, fields(width = layout.width, height = layout.height))]
pub fn build_field(
    layout: &FieldLayout,
    stats: &mut SimulationStatistics,
    seed: u64,
) -> Result<CellField> {
    layout.validate()?;

    for preset in &layout.cell_types {
        stats.observe_antibiotic(preset.antibiotic_level);
    }

    let base = match layout.cell_type(&layout.base_cell_type) {
        Some(preset) => preset.clone(),
        None => {
            warn!(base = %layout.base_cell_type, "Base cell type not found, using default");
            CellType::base()
        }
    };
    let mut field = CellField::with_base_cell(layout.width, layout.height, &base, stats, seed)?;

    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut record = |kind: &str, name: &str, result: Result<usize>| match result {
        Ok(_) => applied += 1,
        Err(err) => {
            warn!(kind, preset = name, error = %err, "Skipping drop");
            skipped += 1;
        }
    };

    for drop in &layout.cell_drops {
        let result = layout
            .cell_type(&drop.type_name)
            .ok_or_else(|| Error::UnknownPreset(drop.type_name.clone()))
            .and_then(|preset| {
                field.drop_cell(Position::new(drop.x, drop.y), drop.r, preset, stats)
            });
        record("cell", &drop.type_name, result);
    }

    for drop in &layout.entity_drops {
        let result = layout
            .entity_type(&drop.type_name)
            .ok_or_else(|| Error::UnknownPreset(drop.type_name.clone()))
            .and_then(|preset| field.drop_entity(Position::new(drop.x, drop.y), drop.r, preset));
        record("entity", &drop.type_name, result);
    }

    for rect in &layout.cell_rects {
        let result = layout
            .cell_type(&rect.type_name)
            .ok_or_else(|| Error::UnknownPreset(rect.type_name.clone()))
            .and_then(|preset| {
                field.drop_cell_rect(Position::new(rect.x, rect.y), rect.w, rect.h, preset, stats)
            });
        record("cell_rect", &rect.type_name, result);
    }

    for rect in &layout.entity_rects {
        let result = layout
            .entity_type(&rect.type_name)
            .ok_or_else(|| Error::UnknownPreset(rect.type_name.clone()))
            .and_then(|preset| {
                field.drop_entity_rect(Position::new(rect.x, rect.y), rect.w, rect.h, preset)
            });
        record("entity_rect", &rect.type_name, result);
    }

    info!(
        base = %base.name,
        drops_applied = applied,
        drops_skipped = skipped,
        entities = field.entity_count(),
        "Field layout applied"
    );
    Ok(field)
}
