//! チャンネルを使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの送信キュー（bounded `mpsc::Sender`）を管理
//! - イベントの送信（push_to, deliver）
//!
//! ## 設計ノート
//!
//! 送信キューの生成は UI 層（Gateway）で行われ、受信側は Gateway の送信ループが保持します。
//! Pusher は 1 つの Room アクターが排他的に所有するため、ロックを持ちません。
//!
//! キューが満杯の接続は送信側を破棄して切り離します。Gateway はキューが閉じたことを検知して
//! ソケットを閉じ、`leave` を Room に送ります。

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{ConnectionId, Delivery, MessagePushError, RoomEvent};

/// Outbound queue of one connection.
pub type PusherChannel = mpsc::Sender<RoomEvent>;

#[derive(Default)]
pub struct ChannelMessagePusher {
    /// Key: connection_id, Value: 送信キュー
    clients: HashMap<ConnectionId, PusherChannel>,
}

impl ChannelMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&mut self, connection_id: ConnectionId, sender: PusherChannel) {
        self.clients.insert(connection_id, sender);
        tracing::debug!("Connection {} registered to pusher", connection_id);
    }

    pub fn unregister_client(&mut self, connection_id: ConnectionId) {
        if self.clients.remove(&connection_id).is_some() {
            tracing::debug!("Connection {} unregistered from pusher", connection_id);
        }
    }

    /// 特定の接続へイベントを送信
    pub fn push_to(
        &self,
        connection_id: ConnectionId,
        event: RoomEvent,
    ) -> Result<(), MessagePushError> {
        let sender = self
            .clients
            .get(&connection_id)
            .ok_or(MessagePushError::ClientNotFound(connection_id))?;
        sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => MessagePushError::QueueFull(connection_id),
            TrySendError::Closed(_) => MessagePushError::Closed(connection_id),
        })
    }

    /// 配送リストを順に送信する
    ///
    /// 送信に失敗した接続は切り離します。退出処理は Gateway からの leave で行われます。
    /// 既に切り離された接続宛ての配送は黙ってスキップします。
    pub fn deliver(&mut self, deliveries: Vec<Delivery>) {
        for Delivery { to, event } in deliveries {
            match self.push_to(to, event) {
                Ok(()) => {}
                Err(MessagePushError::ClientNotFound(_)) => {
                    tracing::trace!("Connection {} is detached, skipping", to);
                }
                Err(e) => {
                    tracing::warn!("Detaching connection {}: {}", to, e);
                    self.unregister_client(to);
                }
            }
        }
    }
}
