//! メッセージ送信（通知）の実装
//!
//! Room アクターが生成したイベントを、各接続の送信キューへ届けます。
//!
//! - `channel`: tokio の bounded mpsc チャンネルを使った実装

pub mod channel;

pub use channel::{ChannelMessagePusher, PusherChannel};
