//! Domain errors
//!
//! 各層で発生するエラーの分類。`JoinError` はハンドシェイク失敗時に
//! クライアントへ返すエラー理由（reason）の元にもなります。

use thiserror::Error;

use super::value_object::{ConnectionId, SpaceId, UserId};

/// Invalid value objects or geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{field} must not be empty")]
    EmptyIdentifier { field: &'static str },

    #[error("{field} is too long ({len} > {max} bytes)")]
    IdentifierTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("dimensions must be positive, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("invalid dimensions '{0}', expected WIDTHxHEIGHT")]
    InvalidDimensions(String),

    #[error("cell ({x}, {y}) lies outside the {width}x{height} space")]
    CellOutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
}

/// The spawn allocator found no free cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no free spawn cell left in the space")]
pub struct SpaceFullError;

/// Reasons a Room refuses a join.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRejection {
    #[error(transparent)]
    SpaceFull(#[from] SpaceFullError),

    #[error("user '{0}' is already in the space")]
    DuplicateUser(UserId),

    #[error("connection {0} has already joined")]
    DuplicateConnection(ConnectionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is missing")]
    MissingToken,

    #[error("token is invalid: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("space '{0}' not found")]
    SpaceNotFound(SpaceId),

    #[error("space storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid space catalog: {0}")]
    InvalidCatalog(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection {0} is not registered")]
    ClientNotFound(ConnectionId),

    #[error("outbound queue of connection {0} is full")]
    QueueFull(ConnectionId),

    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// Why a join handshake failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("authentication failed")]
    AuthenticationFailure,

    #[error("space '{0}' not found")]
    SpaceNotFound(String),

    #[error("space '{0}' has no free spawn cell")]
    SpaceFull(SpaceId),

    #[error("user '{0}' is already in the space")]
    DuplicateUser(UserId),

    #[error("space geometry unavailable: {0}")]
    GeometryUnavailable(String),

    #[error("room for space '{0}' is unavailable, try again")]
    RoomUnavailable(SpaceId),
}

impl JoinError {
    /// Stable reason code sent in error frames.
    pub fn reason(&self) -> &'static str {
        match self {
            JoinError::AuthenticationFailure => "authentication-failure",
            JoinError::SpaceNotFound(_) => "space-not-found",
            JoinError::SpaceFull(_) => "space-full",
            JoinError::DuplicateUser(_) => "duplicate-user",
            JoinError::GeometryUnavailable(_) => "geometry-unavailable",
            JoinError::RoomUnavailable(_) => "room-unavailable",
        }
    }

    /// Maps a Room-level rejection onto the handshake taxonomy.
    pub fn from_rejection(space_id: &SpaceId, rejection: JoinRejection) -> Self {
        match rejection {
            JoinRejection::SpaceFull(_) => JoinError::SpaceFull(space_id.clone()),
            JoinRejection::DuplicateUser(user_id) => JoinError::DuplicateUser(user_id),
            JoinRejection::DuplicateConnection(_) => JoinError::RoomUnavailable(space_id.clone()),
        }
    }
}

impl From<RepositoryError> for JoinError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::SpaceNotFound(space_id) => {
                JoinError::SpaceNotFound(space_id.into_string())
            }
            other => JoinError::GeometryUnavailable(other.to_string()),
        }
    }
}
