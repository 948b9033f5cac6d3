use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

}

impl RecoupError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            RecoupError::Config(_) => "CONFIG_ERROR",
            RecoupError::BadRequest(_) => "BAD_REQUEST",
            RecoupError::Database(_) => "DATABASE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RecoupError>;
