//! Message formatting utilities for client display.

use hiroba_server::infrastructure::dto::websocket::{PositionDto, ServerMessage, UserPositionDto};
use hiroba_shared::time::millis_to_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format any server frame. `received_at` is Unix milliseconds.
    pub fn format(message: &ServerMessage, received_at: i64) -> String {
        let at = millis_to_rfc3339(received_at);
        match message {
            ServerMessage::SpaceJoined { spawn, users } => Self::format_space_joined(spawn, users),
            ServerMessage::UserJoined { user_id, position } => {
                format!("\n+ {} entered at {} ({})\n", user_id, pos(position), at)
            }
            ServerMessage::Movement { x, y, user_id } => {
                format!("\n> {} moved to ({}, {})\n", user_id, x, y)
            }
            ServerMessage::MovementRejected { x, y } => {
                format!("\n! move rejected, you are at ({}, {})\n", x, y)
            }
            ServerMessage::UserLeft { user_id } => format!("\n- {} left ({})\n", user_id, at),
            ServerMessage::Error { reason, message } => {
                format!("\n[error] {}: {}\n", reason, message)
            }
        }
    }

    /// Format the join acknowledgement with everyone already present
    pub fn format_space_joined(spawn: &PositionDto, users: &[UserPositionDto]) -> String {
        let mut output = String::new();
        output.push_str("\n\n============================================================\n");
        output.push_str(&format!("Joined! You spawned at {}\n", pos(spawn)));
        output.push_str("Participants:\n");
        if users.is_empty() {
            output.push_str("(No one else is here)\n");
        } else {
            for user in users {
                output.push_str(&format!("{} at {}\n", user.user_id, pos(&user.position)));
            }
        }
        output.push_str("============================================================\n");
        output
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n[raw] {}\n", text)
    }
}

fn pos(position: &PositionDto) -> String {
    format!("({}, {})", position.x, position.y)
}
