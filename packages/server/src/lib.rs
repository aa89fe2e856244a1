//! Real-time space session service.
//!
//! Participants connect over WebSocket, join a space with a token, and see
//! each other walk around a grid. Each occupied space is served by its own
//! sequential Room actor.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
