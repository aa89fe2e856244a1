//! WebSocket wire messages.
//!
//! Every frame is a JSON object `{"type": ..., "payload": {...}}`.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDto {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPositionDto {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub position: PositionDto,
}

/// Client → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "spaceId")]
        space_id: String,
        token: String,
    },
    Move {
        #[serde(deserialize_with = "coordinate")]
        x: i64,
        #[serde(deserialize_with = "coordinate")]
        y: i64,
    },
}

/// Any JSON number is a coordinate.
///
/// Integral values saturate to the `i64` range. Fractional values map to
/// `i64::MIN`, which no grid contains, so the move is rejected rather than
/// dropped as malformed.
fn coordinate<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(value) = number.as_i64() {
        return Ok(value);
    }
    if number.is_u64() {
        return Ok(i64::MAX);
    }
    match number.as_f64() {
        Some(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        _ => Ok(i64::MIN),
    }
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    SpaceJoined {
        spawn: PositionDto,
        #[serde(default)]
        users: Vec<UserPositionDto>,
    },
    UserJoined {
        #[serde(rename = "userId")]
        user_id: String,
        position: PositionDto,
    },
    Movement {
        x: i64,
        y: i64,
        #[serde(rename = "userId")]
        user_id: String,
    },
    MovementRejected {
        x: i64,
        y: i64,
    },
    UserLeft {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Error {
        reason: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(reason: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            reason: reason.into(),
            message: message.into(),
        }
    }
}
