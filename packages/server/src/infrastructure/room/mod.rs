//! Room アクターとレジストリ
//!
//! - `actor`: 1 つの空間の状態を所有し、join / move / leave を 1 件ずつ順番に処理するタスク
//! - `registry`: spaceId → Room アクターの対応表。最初の join で生成し、空になったら破棄する

mod actor;
mod registry;

pub use actor::{RoomClosed, RoomHandle};
pub use registry::{JoinedRoom, RoomRegistry};
