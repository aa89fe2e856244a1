//! Request handlers.

mod http;
mod websocket;

pub use http::{get_space_detail, get_spaces, health_check};
pub use websocket::websocket_handler;
