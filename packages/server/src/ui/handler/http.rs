//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::http::{SpaceDetailDto, SpaceSummaryDto},
    ui::state::AppState,
    usecase::GetSpaceDetailError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Live rooms, sorted by spaceId
pub async fn get_spaces(State(state): State<Arc<AppState>>) -> Json<Vec<SpaceSummaryDto>> {
    let snapshots = state.get_spaces_usecase.execute().await;

    // Domain Model から DTO への変換
    Json(snapshots.into_iter().map(SpaceSummaryDto::from).collect())
}

pub async fn get_space_detail(
    State(state): State<Arc<AppState>>,
    Path(space_id): Path<String>,
) -> Result<Json<SpaceDetailDto>, StatusCode> {
    match state.get_space_detail_usecase.execute(&space_id).await {
        Ok(snapshot) => Ok(Json(SpaceDetailDto::from(snapshot))),
        Err(GetSpaceDetailError::SpaceNotFound(_)) => Err(StatusCode::NOT_FOUND),
    }
}
