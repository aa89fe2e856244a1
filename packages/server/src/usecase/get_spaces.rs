//! UseCase: 生きている Room の一覧取得

use std::sync::Arc;

use crate::{domain::RoomSnapshot, infrastructure::room::RoomRegistry};

pub struct GetSpacesUseCase {
    registry: Arc<RoomRegistry>,
}

impl GetSpacesUseCase {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// spaceId 順のスナップショット。取得中に閉じた Room は含めない。
    pub async fn execute(&self) -> Vec<RoomSnapshot> {
        let mut snapshots = Vec::new();
        for room in self.registry.rooms().await {
            if let Some(snapshot) = room.snapshot().await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }
}
