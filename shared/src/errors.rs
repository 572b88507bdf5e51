//! Shared error types for the batch generation system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
