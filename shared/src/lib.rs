//! Shared types for the batch generation system
//!
//! Contains the types that cross crate boundaries: job snapshots, work items,
//! provider identities, the sample generator contract and the messages
//! exchanged with trigger surfaces and live status consumers.

pub mod errors;
pub mod generator;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use generator::{FailureKind, GenerationAttempt, GenerationFailure, GenerationRequest, SampleGenerator};
pub use types::*;

pub use messages::{
    BatchEvent, BatchListResponse, StartBatchRequest, StartBatchResponse, StopBatchRequest, StopBatchResponse,
};
