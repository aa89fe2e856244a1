//! Infrastructure layer
//!
//! ドメイン層が定義するインターフェースの具体的な実装と、
//! Room アクター・レジストリなどの実行基盤を提供します。

pub mod auth;
pub mod dto;
pub mod message_pusher;
pub mod repository;
pub mod room;
