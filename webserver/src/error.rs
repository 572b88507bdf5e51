//! WebServer-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use orchestrator::OrchestratorError;
use shared::{process_error, ProcessId, SharedError};

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type WebServerResult<T> = Result<T, WebServerError>;

impl WebServerError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebServerError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            WebServerError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrchestratorError> for WebServerError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::InvalidRequest { message } => WebServerError::InvalidRequest { message },
            OrchestratorError::SharedError(shared) => shared.into(),
            OrchestratorError::BatchNotFound { batch_id } => WebServerError::not_found(format!("batch {batch_id}")),
            other => WebServerError::InternalError(other.to_string()),
        }
    }
}

impl From<SharedError> for WebServerError {
    fn from(error: SharedError) -> Self {
        WebServerError::InvalidRequest {
            message: error.to_string(),
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            WebServerError::InvalidRequest { message } => message.clone(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            process_error!(ProcessId::current(), "❌ Request failed: {}", message);
        }

        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}
