use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recoup_core::RecoupError;
use recoup_memory::MemoryError;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Handler error — renders a `RecoupError` as `{"error": ..., "code": ...}`.
pub struct ApiError(pub RecoupError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RecoupError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RecoupError> for ApiError {
    fn from(e: RecoupError) -> Self {
        Self(e)
    }
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        Self(RecoupError::Database(e.to_string()))
    }
}
