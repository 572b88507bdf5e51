//! Orchestrator-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid batch request: {message}")]
    InvalidRequest { message: String },

    #[error("Batch not found: {batch_id}")]
    BatchNotFound { batch_id: String },

    #[error("Configuration error: {field} = {value}")]
    ConfigurationError { field: String, value: String },

    #[error("Batch store {operation} failed: {message}")]
    PersistenceError { operation: String, message: String },

    #[error("Topic catalog error: {message}")]
    CatalogError { message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        OrchestratorError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn persistence(operation: &str, message: impl std::fmt::Display) -> Self {
        OrchestratorError::PersistenceError {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    pub fn config(field: &str, value: impl Into<String>) -> Self {
        OrchestratorError::ConfigurationError {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
