//! Movement validation.
//!
//! A move is a single 4-directional grid step inside the space onto a cell
//! that is not blocked. Pure, no shared state.

use super::{entity::SpaceGeometry, value_object::Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveVerdict {
    Accept,
    Reject(MoveRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    OutOfBounds,
    Blocked,
    /// Zero-length, diagonal, or multi-cell request.
    InvalidStep,
}

/// Decide whether a participant at `current` may move to `requested`.
///
/// Rules are checked in order: bounds, blocked cell, step length.
pub fn validate_move(
    current: Position,
    requested: Position,
    geometry: &SpaceGeometry,
) -> MoveVerdict {
    if !geometry.contains(&requested) {
        return MoveVerdict::Reject(MoveRejection::OutOfBounds);
    }
    if geometry.is_blocked(&requested) {
        return MoveVerdict::Reject(MoveRejection::Blocked);
    }
    if current.manhattan_distance(&requested) != 1 {
        return MoveVerdict::Reject(MoveRejection::InvalidStep);
    }
    MoveVerdict::Accept
}
