//! Room Registry
//!
//! spaceId ごとに生きている Room アクターを管理します。
//! Room は最初の join で生成され、参加者が 0 人になるとアクター自身がレジストリから外れます。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, JoinError, Position, SpaceGeometryRepository, SpaceId, UserId},
    infrastructure::message_pusher::PusherChannel,
};

use super::actor::{JoinReply, RoomActor, RoomHandle, RoomTable};

const MAX_JOIN_ATTEMPTS: usize = 3;

/// A successful join: the room to talk to and the assigned spawn cell.
#[derive(Debug, Clone)]
pub struct JoinedRoom {
    pub room: RoomHandle,
    pub spawn: Position,
}

/// Process-wide map from space to its live Room actor.
pub struct RoomRegistry {
    rooms: Arc<RoomTable>,
    repository: Arc<dyn SpaceGeometryRepository>,
    room_queue_capacity: usize,
    next_instance: AtomicU64,
}

impl RoomRegistry {
    /// 新しい RoomRegistry を作成
    ///
    /// * `repository` - Room 生成時にジオメトリを取得するリポジトリ
    /// * `room_queue_capacity` - 各 Room アクターの受信キューの長さ
    pub fn new(repository: Arc<dyn SpaceGeometryRepository>, room_queue_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            repository,
            room_queue_capacity,
            next_instance: AtomicU64::new(1),
        }
    }

    /// 参加者を空間の Room に参加させる
    ///
    /// Room がなければ生成します。`outbound` には space-joined 以降のイベントが届きます。
    /// 破棄中の Room に当たった場合は作り直して再試行します。
    pub async fn join(
        &self,
        space_id: &SpaceId,
        user_id: UserId,
        connection_id: ConnectionId,
        outbound: PusherChannel,
    ) -> Result<JoinedRoom, JoinError> {
        for attempt in 1..=MAX_JOIN_ATTEMPTS {
            let room = self.get_or_create(space_id).await;
            match room
                .join(connection_id, user_id.clone(), outbound.clone())
                .await
            {
                Ok(JoinReply::Joined(spawn)) => return Ok(JoinedRoom { room, spawn }),
                Ok(JoinReply::Rejected(e)) => return Err(e),
                Ok(JoinReply::Closing) | Err(_) => {
                    tracing::debug!(
                        "Room '{}' was shutting down, retrying join ({}/{})",
                        space_id,
                        attempt,
                        MAX_JOIN_ATTEMPTS
                    );
                }
            }
        }
        Err(JoinError::RoomUnavailable(space_id.clone()))
    }

    /// 生きている Room のハンドルを取得
    pub async fn room(&self, space_id: &SpaceId) -> Option<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.get(space_id).filter(|room| !room.is_closed()).cloned()
    }

    /// 生きている全ての Room（spaceId 順）
    pub async fn rooms(&self) -> Vec<RoomHandle> {
        let rooms = self.rooms.lock().await;
        let mut handles: Vec<RoomHandle> = rooms
            .values()
            .filter(|room| !room.is_closed())
            .cloned()
            .collect();
        handles.sort_by(|a, b| a.space_id().cmp(b.space_id()));
        handles
    }

    /// 生きている Room の数
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn get_or_create(&self, space_id: &SpaceId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get(space_id)
            && !room.is_closed()
        {
            return room.clone();
        }

        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let room = RoomActor::spawn(
            space_id.clone(),
            instance,
            self.room_queue_capacity,
            self.repository.clone(),
            Arc::downgrade(&self.rooms),
        );
        rooms.insert(space_id.clone(), room.clone());
        room
    }
}
