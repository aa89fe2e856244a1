//! UseCase: 空間への参加とセッション操作
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinSpaceUseCase::execute() のハンドシェイク処理
//! - SpaceSession 経由の move / leave
//!
//! ### なぜこのテストが必要か
//! - 認証に失敗したクライアントが Room に入らないことを保証
//! - 失敗理由が error frame の reason に正しく対応することを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの参加、spawn の受け取り
//! - 異常系：不正トークン、存在しない空間、不正な spaceId

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, JoinError, Position, SpaceId, TokenAuthenticator, UserId},
    infrastructure::{
        message_pusher::PusherChannel,
        room::{RoomClosed, RoomHandle, RoomRegistry},
    },
};

/// 空間参加のユースケース
pub struct JoinSpaceUseCase {
    authenticator: Arc<dyn TokenAuthenticator>,
    registry: Arc<RoomRegistry>,
}

impl JoinSpaceUseCase {
    pub fn new(authenticator: Arc<dyn TokenAuthenticator>, registry: Arc<RoomRegistry>) -> Self {
        Self {
            authenticator,
            registry,
        }
    }

    /// 参加を実行
    ///
    /// # Arguments
    ///
    /// * `space_id` - join メッセージの spaceId（未検証）
    /// * `token` - join メッセージのトークン
    /// * `connection_id` - この接続の ID
    /// * `outbound` - space-joined 以降のイベントが届くキュー
    ///
    /// # Returns
    ///
    /// * `Ok(SpaceSession)` - 参加成功。space-joined は既に `outbound` に積まれている
    /// * `Err(JoinError)` - 参加失敗。Room の状態は変わらない
    pub async fn execute(
        &self,
        space_id: String,
        token: &str,
        connection_id: ConnectionId,
        outbound: PusherChannel,
    ) -> Result<SpaceSession, JoinError> {
        // 1. トークン認証
        let user_id = self.authenticator.authenticate(token).await.map_err(|e| {
            tracing::info!("Authentication failed for {}: {}", connection_id, e);
            JoinError::AuthenticationFailure
        })?;

        // 2. spaceId の検証（空文字などは存在しない空間として扱う）
        let space_id =
            SpaceId::new(space_id.clone()).map_err(|_| JoinError::SpaceNotFound(space_id))?;

        // 3. Room に参加
        let joined = self
            .registry
            .join(&space_id, user_id.clone(), connection_id, outbound)
            .await?;

        Ok(SpaceSession {
            user_id,
            connection_id,
            spawn: joined.spawn,
            room: joined.room,
        })
    }
}

/// An Active participant's handle on its Room.
#[derive(Debug, Clone)]
pub struct SpaceSession {
    user_id: UserId,
    connection_id: ConnectionId,
    spawn: Position,
    room: RoomHandle,
}

impl SpaceSession {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn space_id(&self) -> &SpaceId {
        self.room.space_id()
    }

    pub fn spawn(&self) -> Position {
        self.spawn
    }

    /// Post a move request. The verdict arrives on the outbound queue.
    pub async fn move_to(&self, x: i64, y: i64) -> Result<(), RoomClosed> {
        self.room
            .move_to(self.connection_id, Position::new(x, y))
            .await
    }

    pub async fn leave(&self) -> Result<(), RoomClosed> {
        self.room.leave(self.connection_id).await
    }
}
