//! Console renderer consuming field snapshots.

use cell_world::snapshot::{CellView, FieldSnapshot};
use cell_world::SnapshotReceiver;

/// Antibiotic share of the background above which an empty cell is drawn as hostile
const HOSTILE_THRESHOLD: f64 = 0.5;
/// Entities at least this big are drawn in upper case
const LARGE_ENTITY: f32 = 0.5;

/// Draw snapshots until the simulator closes the channel. Returns how many
/// snapshots were received.
pub async fn run(mut receiver: SnapshotReceiver, render_every: u64) -> u64 {
    let mut received = 0u64;

    while let Some(snapshot) = receiver.recv().await {
        received += 1;
        if render_every == 0 || (received - 1) % render_every != 0 {
            continue;
        }

        crate::record_gauge!("entities", snapshot.entities);
        crate::record_gauge!("mutations", snapshot.mutations);
        println!("{}", render(&snapshot));
    }

    received
}

/// Character map of the field with a counter header
pub fn render(snapshot: &FieldSnapshot) -> String {
    let mut out = format!(
        "turn {} | entities {} | mutations {}\n",
        snapshot.turns, snapshot.entities, snapshot.mutations
    );

    for row in snapshot.rows() {
        out.extend(row.iter().map(glyph));
        out.push('\n');
    }

    out
}

fn glyph(cell: &CellView) -> char {
    match cell.entity {
        Some(entity) if entity.size >= LARGE_ENTITY => 'O',
        Some(_) => 'o',
        None if cell.back_color.r > HOSTILE_THRESHOLD => '#',
        None => '.',
    }
}
