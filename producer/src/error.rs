//! Producer error types

use thiserror::Error;
use shared::ProviderId;

/// Result type for producer operations
pub type ProducerResult<T> = Result<T, ProducerError>;

/// Producer error types
///
/// Display strings are what the orchestrator's error classifier sees, so
/// provider-side variants keep the HTTP status and reason in their text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProducerError {
    #[error("Authentication failed for {provider}: {variable} is not set")]
    MissingApiKey { provider: ProviderId, variable: String },

    #[error("{provider} returned {status}: {body}")]
    HttpStatus { provider: ProviderId, status: String, body: String },

    #[error("{provider} request timed out: {message}")]
    RequestTimeout { provider: ProviderId, message: String },

    #[error("{provider} connection error: {message}")]
    Connection { provider: ProviderId, message: String },

    #[error("{provider} response format error: {message}")]
    ResponseFormat { provider: ProviderId, message: String },

    #[error("Invalid sample: {message}")]
    InvalidSample { message: String },

    #[error("Invalid {field}: {value}")]
    InvalidSetting { field: String, value: String },
}

impl ProducerError {
    pub fn invalid_sample(message: impl Into<String>) -> Self {
        Self::InvalidSample {
            message: message.into(),
        }
    }

    /// True when the provider answered and the failure lies in its output
    pub fn is_content_failure(&self) -> bool {
        matches!(self, ProducerError::InvalidSample { .. })
    }
}
