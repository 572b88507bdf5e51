//! Trigger surface requests and responses

use serde::{Deserialize, Serialize};

use crate::types::{BatchJob, Difficulty, ProviderId, SampleTypeFilter};

/// Request to start a new batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartBatchRequest {
    pub target: u32,
    /// Defaults to the first provider in the configured order
    #[serde(default)]
    pub provider: Option<ProviderId>,
    /// Defaults to the provider's first fallback model
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub sample_type: SampleTypeFilter,
}

impl StartBatchRequest {
    pub fn new(target: u32) -> Self {
        Self {
            target,
            provider: None,
            model: None,
            topic: None,
            difficulty: None,
            sample_type: SampleTypeFilter::Balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartBatchResponse {
    pub batch_id: String,
}

/// Request to stop one batch, or every running batch when no id is given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopBatchRequest {
    #[serde(default)]
    pub batch_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopBatchResponse {
    pub stopped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchListResponse {
    pub batches: Vec<BatchJob>,
}
