//! Trait definitions with mockall annotations for testing
//!
//! The orchestrator depends on its collaborators only through these traits,
//! which keeps the batch loop testable without disk or network.

use shared::{BatchEvent, BatchJob, GeneratedSample};

use crate::error::OrchestratorResult;

/// Durable storage for batch records and their samples
///
/// Shared by every running job. Implementations must serialize writes,
/// since each write is a read-modify-write of shared contents.
#[mockall::automock]
#[async_trait::async_trait]
pub trait BatchStore: Send + Sync {
    /// Record a newly created batch
    async fn create(&self, job: &BatchJob) -> OrchestratorResult<()>;

    /// Replace the stored record for `job.id`
    async fn update(&self, job: &BatchJob) -> OrchestratorResult<()>;

    /// Look up one batch record
    ///
    /// # Returns
    /// The stored snapshot, or None when the id is unknown
    async fn get_by_job_id(&self, batch_id: &str) -> OrchestratorResult<Option<BatchJob>>;

    /// All stored batch records, in no particular order
    async fn list(&self) -> OrchestratorResult<Vec<BatchJob>>;

    /// Durably append generated samples for a batch
    ///
    /// # Parameters
    /// - `batch_id`: Owning batch
    /// - `samples`: Samples to append; nothing is written on error
    async fn append_samples(&self, batch_id: &str, samples: &[GeneratedSample]) -> OrchestratorResult<()>;
}

/// Push sink for live status events
///
/// Delivery is best-effort. Consumers recover current state by polling the
/// manager, so publish must never block or fail the caller.
#[mockall::automock]
pub trait StatusSink: Send + Sync {
    fn publish(&self, event: BatchEvent);
}
