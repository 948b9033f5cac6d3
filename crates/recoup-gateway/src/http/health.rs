use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "base_prompt_chars": state.sessions.base_prompt().as_str().len(),
        "base_prompt_file": state.config.prompt.base_prompt_path,
        "knowledge": {
            "supported_types": state.config.knowledge.supported_types,
            "fetch_timeout_secs": state.config.knowledge.fetch_timeout_secs,
        },
    }))
}
