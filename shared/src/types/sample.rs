//! Generated samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::ProviderId;
use super::work::{Difficulty, SampleType, WorkItem};

/// Payload returned by a sample generator, before the orchestrator stamps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleContent {
    pub work_item: WorkItem,
    pub sample_type: SampleType,
    pub body: serde_json::Value,
}

/// A persisted sample: generator payload plus traceability metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSample {
    pub id: String,
    pub batch_id: String,
    pub provider: ProviderId,
    pub model: String,
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
    pub sample_type: SampleType,
    pub tokens_used: u64,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GeneratedSample {
    /// Stamp identity and provenance onto generator output, ignoring anything the
    /// generator may have put in those fields itself
    pub fn stamp(content: SampleContent, batch_id: &str, provider: ProviderId, model: &str, tokens_used: u64) -> Self {
        let now = Utc::now();
        let mut body = content.body;
        if let Some(fields) = body.as_object_mut() {
            for reserved in ["id", "batch_id", "provider", "model", "created_at", "updated_at"] {
                fields.remove(reserved);
            }
        }

        Self {
            id: format!("{}_{}", provider, Uuid::new_v4()),
            batch_id: batch_id.to_string(),
            provider,
            model: model.to_string(),
            category: content.work_item.category,
            subcategory: content.work_item.subcategory,
            difficulty: content.work_item.difficulty,
            sample_type: content.sample_type,
            tokens_used,
            body,
            created_at: now,
            updated_at: now,
        }
    }
}
