//! UseCase: Room の詳細取得

use std::sync::Arc;

use crate::{
    domain::{RoomSnapshot, SpaceId},
    infrastructure::room::RoomRegistry,
};

use super::error::GetSpaceDetailError;

pub struct GetSpaceDetailUseCase {
    registry: Arc<RoomRegistry>,
}

impl GetSpaceDetailUseCase {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 生きている Room がなければ `SpaceNotFound`
    pub async fn execute(&self, space_id: &str) -> Result<RoomSnapshot, GetSpaceDetailError> {
        let not_found = || GetSpaceDetailError::SpaceNotFound(space_id.to_string());

        let space_id = SpaceId::new(space_id.to_string()).map_err(|_| not_found())?;
        let room = self.registry.room(&space_id).await.ok_or_else(not_found)?;
        room.snapshot().await.ok_or_else(not_found)
    }
}
