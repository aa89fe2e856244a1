//! Error types for the client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server closed the connection during the handshake (bad or expired token)
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The server answered the join with an error frame
    #[error("Join rejected ({reason}): {message}")]
    JoinRejected { reason: String, message: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Unexpected handshake reply: {0}")]
    UnexpectedReply(String),
}
