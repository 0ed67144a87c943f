use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JukeboxError {
    #[error("Invalid session ID format: {0}")]
    InvalidSessionId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Song {0} is already in the queue")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

// Tells Axum how to convert our errors into HTTP responses
impl IntoResponse for JukeboxError {
    fn into_response(self) -> Response {
        let (status, label, message) = match &self {
            JukeboxError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, "error", message.clone())
            }
            // Handlers replace a bad session cookie instead of rejecting it,
            // so only direct callers of `SessionId::new` see this one
            JukeboxError::InvalidSessionId(_) => {
                (StatusCode::BAD_REQUEST, "error", self.to_string())
            }
            JukeboxError::Duplicate(_) => (
                StatusCode::CONFLICT,
                "duplicate",
                "Song already selected".to_string(),
            ),
            JukeboxError::NotFound(_) => (StatusCode::NOT_FOUND, "error", self.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(json!({ "status": label, "message": message }))).into_response()
    }
}

pub type JukeboxResult<T> = Result<T, JukeboxError>;
