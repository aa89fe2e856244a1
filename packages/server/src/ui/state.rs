//! Shared application state.

use std::sync::Arc;

use crate::{
    config::ServerConfig,
    usecase::{GetSpaceDetailUseCase, GetSpacesUseCase, JoinSpaceUseCase},
};

pub struct AppState {
    /// JoinSpaceUseCase（ハンドシェイクと参加）
    pub join_space_usecase: Arc<JoinSpaceUseCase>,
    /// GetSpacesUseCase（Room 一覧取得）
    pub get_spaces_usecase: Arc<GetSpacesUseCase>,
    /// GetSpaceDetailUseCase（Room 詳細取得）
    pub get_space_detail_usecase: Arc<GetSpaceDetailUseCase>,
    pub config: ServerConfig,
}
