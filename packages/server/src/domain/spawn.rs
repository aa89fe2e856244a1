//! Spawn allocation.

use std::collections::HashSet;

use super::{entity::SpaceGeometry, error::SpaceFullError, value_object::Position};

/// Pick the spawn cell for a newly joining participant.
///
/// Cells are scanned row-major from the origin; the first one that is neither
/// blocked nor in `occupied` wins, so the result is reproducible.
pub fn allocate_spawn(
    geometry: &SpaceGeometry,
    occupied: &HashSet<Position>,
) -> Result<Position, SpaceFullError> {
    let width = i64::from(geometry.width());
    (0..i64::from(geometry.height()))
        .flat_map(|y| (0..width).map(move |x| Position::new(x, y)))
        .find(|cell| !geometry.is_blocked(cell) && !occupied.contains(cell))
        .ok_or(SpaceFullError)
}
