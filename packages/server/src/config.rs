//! Server configuration.

use std::time::Duration;

/// Runtime knobs for the gateway and room actors.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long a new connection may take to send its `join` frame.
    pub handshake_timeout: Duration,
    /// Per-connection outbound queue bound. A participant whose queue fills up is disconnected.
    pub outbound_queue_capacity: usize,
    /// Per-room mailbox bound.
    pub room_queue_capacity: usize,
    /// Malformed frames tolerated after the handshake before the connection is closed.
    pub max_malformed_frames: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            handshake_timeout: Duration::from_secs(10),
            outbound_queue_capacity: 256,
            room_queue_capacity: 1024,
            max_malformed_frames: 32,
        }
    }
}
