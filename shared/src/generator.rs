//! Contract between the orchestrator and sample generators
//!
//! A generator turns one work item into one sample, or reports why it could
//! not. Calls carry no side effects the orchestrator can observe, so they are
//! always safe to retry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::types::{ProviderId, SampleContent, SampleType, WorkItem};

/// Everything a generator needs for one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub batch_id: String,
    pub work_item: WorkItem,
    pub sample_type: SampleType,
    pub provider: ProviderId,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider call itself failed (HTTP, network, quota, ...)
    Provider,
    /// The provider answered but the output was malformed or mismatched
    ContentValidation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn provider(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Provider,
            message: message.into(),
        }
    }

    pub fn content(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ContentValidation,
            message: message.into(),
        }
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result of one generator call: exactly one of sample or failure
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationAttempt {
    pub outcome: Result<SampleContent, GenerationFailure>,
    pub tokens_used: u64,
    pub elapsed: Duration,
}

impl GenerationAttempt {
    pub fn success(content: SampleContent, tokens_used: u64, elapsed: Duration) -> Self {
        Self {
            outcome: Ok(content),
            tokens_used,
            elapsed,
        }
    }

    pub fn failure(failure: GenerationFailure, elapsed: Duration) -> Self {
        Self {
            outcome: Err(failure),
            tokens_used: 0,
            elapsed,
        }
    }
}

/// Sample generation capability, one implementation per backend
#[async_trait::async_trait]
pub trait SampleGenerator: Send + Sync {
    /// Attempt to generate a single sample
    ///
    /// # Parameters
    /// - `request`: Work item, sample type and the provider/model to target
    ///
    /// # Returns
    /// A GenerationAttempt whose outcome carries the sample content on success.
    /// On success the content's work item fields match the request.
    async fn generate(&self, request: &GenerationRequest) -> GenerationAttempt;
}
