//! Conversion logic between DTOs and domain types.

use hiroba_shared::time::millis_to_rfc3339;

use crate::domain::{JoinError, Participant, PeerPosition, Position, RoomEvent, RoomSnapshot};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// DTO → Domain
// ========================================

impl From<dto::PositionDto> for Position {
    fn from(dto: dto::PositionDto) -> Self {
        Position::new(dto.x, dto.y)
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<Position> for dto::PositionDto {
    fn from(position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
        }
    }
}

impl From<PeerPosition> for dto::UserPositionDto {
    fn from(peer: PeerPosition) -> Self {
        Self {
            user_id: peer.user_id.into_string(),
            position: peer.position.into(),
        }
    }
}

impl From<RoomEvent> for dto::ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::SpaceJoined { spawn, users } => dto::ServerMessage::SpaceJoined {
                spawn: spawn.into(),
                users: users.into_iter().map(Into::into).collect(),
            },
            RoomEvent::UserJoined { user_id, position } => dto::ServerMessage::UserJoined {
                user_id: user_id.into_string(),
                position: position.into(),
            },
            RoomEvent::Movement { user_id, position } => dto::ServerMessage::Movement {
                x: position.x,
                y: position.y,
                user_id: user_id.into_string(),
            },
            RoomEvent::MovementRejected { position } => dto::ServerMessage::MovementRejected {
                x: position.x,
                y: position.y,
            },
            RoomEvent::UserLeft { user_id } => dto::ServerMessage::UserLeft {
                user_id: user_id.into_string(),
            },
        }
    }
}

impl From<&JoinError> for dto::ServerMessage {
    fn from(error: &JoinError) -> Self {
        dto::ServerMessage::error(error.reason(), error.to_string())
    }
}

impl From<Participant> for http::ParticipantDetailDto {
    fn from(participant: Participant) -> Self {
        Self {
            user_id: participant.user_id.into_string(),
            position: participant.position.into(),
            joined_at: millis_to_rfc3339(participant.joined_at),
        }
    }
}

impl From<RoomSnapshot> for http::SpaceDetailDto {
    fn from(snapshot: RoomSnapshot) -> Self {
        Self {
            space_id: snapshot.space_id.into_string(),
            width: snapshot.dimensions.width(),
            height: snapshot.dimensions.height(),
            participants: snapshot.participants.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<RoomSnapshot> for http::SpaceSummaryDto {
    fn from(snapshot: RoomSnapshot) -> Self {
        Self {
            participant_count: snapshot.participants.len(),
            space_id: snapshot.space_id.into_string(),
        }
    }
}
