//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::PositionDto;

/// Live room summary (`GET /api/spaces`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSummaryDto {
    pub space_id: String,
    pub participant_count: usize,
}

/// Live room detail (`GET /api/spaces/{space_id}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDetailDto {
    pub space_id: String,
    pub width: u32,
    pub height: u32,
    pub participants: Vec<ParticipantDetailDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetailDto {
    pub user_id: String,
    pub position: PositionDto,
    /// RFC 3339
    pub joined_at: String,
}
