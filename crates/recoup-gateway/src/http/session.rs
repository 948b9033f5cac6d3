//! Session start endpoints.
//!
//! `GET  /api/session/init?roomId=..&artistId=..&q=..&<callback params>`
//! `POST /api/session/init` with `{"roomId", "artistId", "query", "oauth"}`
//!
//! Both return `{"systemPrompt": "...", "messages": [...], "source": "..."}`.
//! Session start never fails on storage or knowledge-base errors, so neither
//! endpoint has an error path beyond malformed input.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use recoup_agent::{SessionInitContext, SessionStart};

use crate::app::AppState;

const ROOM_PARAM: &str = "roomId";
const ARTIST_PARAM: &str = "artistId";
const QUERY_PARAM: &str = "q";

/// GET — the chat page URL forwards its own query string here, so any
/// parameter that isn't one of ours is treated as an authorization callback
/// parameter.
pub async fn init_from_query(
    State(state): State<Arc<AppState>>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Json<SessionStart> {
    let room_id = take_non_empty(&mut params, ROOM_PARAM);
    let artist_id = take_non_empty(&mut params, ARTIST_PARAM);
    let query = params.remove(QUERY_PARAM);
    let ctx = SessionInitContext {
        room_id: room_id.map(Into::into),
        artist_id: artist_id.map(Into::into),
        query,
        oauth_continuation: (!params.is_empty()).then_some(params),
    };
    Json(state.sessions.start(&ctx).await)
}

/// POST — explicit JSON body.
pub async fn init_from_body(
    State(state): State<Arc<AppState>>,
    Json(ctx): Json<SessionInitContext>,
) -> Json<SessionStart> {
    Json(state.sessions.start(&ctx).await)
}

fn take_non_empty(params: &mut HashMap<String, String>, key: &str) -> Option<String> {
    params.remove(key).filter(|v| !v.trim().is_empty())
}
