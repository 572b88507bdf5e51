//! Batch generation orchestrator
//!
//! Drives long-running sample generation jobs against unreliable,
//! rate-limited providers: retries locally, fails over across models and
//! providers, skips persistently failing work items, checkpoints to a batch
//! store and publishes live status events. Collaborators are injected as
//! trait objects so the loop can be tested without disk or network.

pub mod config;
pub mod core;
pub mod error;
pub mod manager;
pub mod orchestrator;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::OrchestratorConfig;
pub use core::{CircuitBreaker, ErrorClassifier, FallbackSelector, RateWindow, TopicCatalog, WorkCycle};
pub use error::{OrchestratorError, OrchestratorResult};
pub use manager::BatchManager;
pub use orchestrator::{BatchOrchestrator, BatchServices};
pub use services::{BroadcastStatusChannel, FileBatchStore, InMemoryBatchStore};
pub use traits::{BatchStore, StatusSink};
