use axum::{
    routing::get,
    Router,
};
use recoup_agent::SessionInitializer;
use recoup_core::config::RecoupConfig;
use recoup_memory::MemoryManager;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RecoupConfig,
    pub memory: Arc<MemoryManager>,
    pub sessions: SessionInitializer,
}

impl AppState {
    pub fn new(config: RecoupConfig, memory: Arc<MemoryManager>, sessions: SessionInitializer) -> Self {
        Self {
            config,
            memory,
            sessions,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/api/session/init",
            get(crate::http::session::init_from_query).post(crate::http::session::init_from_body),
        )
        .route(
            "/api/memories",
            get(crate::http::memories::list_memories).post(crate::http::memories::create_memory),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
