//! Entities

use std::collections::HashSet;

use super::{
    error::DomainError,
    value_object::{ConnectionId, Dimensions, Position, SpaceId, UserId},
};

/// Static geometry of a space: its bounds and the cells nobody may stand on.
///
/// Fetched once when a Room is created and immutable for the Room's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceGeometry {
    dimensions: Dimensions,
    blocked_cells: HashSet<Position>,
}

impl SpaceGeometry {
    /// Every blocked cell must lie inside `dimensions`.
    pub fn new(
        dimensions: Dimensions,
        blocked_cells: impl IntoIterator<Item = Position>,
    ) -> Result<Self, DomainError> {
        let blocked_cells: HashSet<Position> = blocked_cells.into_iter().collect();
        if let Some(cell) = blocked_cells.iter().find(|c| !dimensions.contains(c)) {
            return Err(DomainError::CellOutOfBounds {
                x: cell.x,
                y: cell.y,
                width: dimensions.width(),
                height: dimensions.height(),
            });
        }
        Ok(Self {
            dimensions,
            blocked_cells,
        })
    }

    /// A space with no blocked cells.
    pub fn open(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            blocked_cells: HashSet::new(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width()
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height()
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.dimensions.contains(position)
    }

    pub fn is_blocked(&self, position: &Position) -> bool {
        self.blocked_cells.contains(position)
    }

    pub fn blocked_cells(&self) -> &HashSet<Position> {
        &self.blocked_cells
    }
}

/// One connected user's live presence in a Room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub position: Position,
    /// Unix milliseconds.
    pub joined_at: i64,
}

impl Participant {
    pub fn new(
        connection_id: ConnectionId,
        user_id: UserId,
        position: Position,
        joined_at: i64,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            position,
            joined_at,
        }
    }
}

/// Read-only copy of a Room's state, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub space_id: SpaceId,
    pub dimensions: Dimensions,
    pub participants: Vec<Participant>,
}
