//! Terminal client for the space session server.

mod command;
mod error;
mod formatter;
mod session;
mod ui;

pub use command::{Command, parse_command};
pub use error::ClientError;
pub use formatter::MessageFormatter;
pub use session::run_client_session;
