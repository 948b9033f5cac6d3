//! Stored chat turns — GET/POST /api/memories
//!
//! GET  `?roomId=<id>[&artistId=<id>]` → `{"data": [memory...], "error": null}`
//!      With `artistId`, a room that belongs to a different artist yields `[]`.
//! POST `{"room_id", "artist_id"?, "content"}` → `{"data": memory}`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use recoup_core::{ArtistId, RecoupError, RoomId};
use recoup_memory::Memory;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::error::ApiError;
use crate::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoriesQuery {
    pub room_id: Option<String>,
    pub artist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemory {
    pub room_id: String,
    #[serde(default)]
    pub artist_id: Option<String>,
    /// Message envelope, stored verbatim.
    pub content: Value,
}

pub async fn list_memories(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MemoriesQuery>,
) -> Result<Json<Value>, ApiError> {
    let room_id = q
        .room_id
        .filter(|r| !r.trim().is_empty())
        .map(RoomId::from)
        .ok_or_else(|| RecoupError::BadRequest("roomId is required".to_string()))?;

    let memories: Vec<Memory> = match q.artist_id.filter(|a| !a.trim().is_empty()) {
        Some(artist_id) => state
            .memory
            .list_memories_for_artist(&room_id, &ArtistId::from(artist_id))?,
        None => state.memory.list_memories(&room_id)?,
    };
    debug!(room_id = %room_id, count = memories.len(), "memories listed");

    Ok(Json(json!({ "data": memories, "error": null })))
}

pub async fn create_memory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMemory>,
) -> Result<Json<Value>, ApiError> {
    if req.room_id.trim().is_empty() {
        return Err(RecoupError::BadRequest("room_id cannot be empty".to_string()).into());
    }
    if req.content.is_null() {
        return Err(RecoupError::BadRequest("content is required".to_string()).into());
    }

    let artist_id = req.artist_id.map(ArtistId::from);
    let memory = state
        .memory
        .save_memory(&RoomId::from(req.room_id), artist_id.as_ref(), &req.content)?;

    Ok(Json(json!({ "data": memory })))
}
