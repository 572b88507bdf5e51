//! Live status events emitted by running batches

use serde::{Deserialize, Serialize};

use crate::types::{BatchJob, SwitchRecord};

/// Typed event carrying a snapshot of the job it concerns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// Job state changed (started, sample generated, checkpoint)
    Progress { batch: BatchJob },
    /// Generation target moved to another model or provider
    Switch { record: SwitchRecord, batch: BatchJob },
    /// A work item was passed over because its circuit is open
    Skipped { work_item: String, batch: BatchJob },
    /// Job reached a terminal status; last event for this job
    Terminal { batch: BatchJob },
}

impl BatchEvent {
    pub fn batch(&self) -> &BatchJob {
        match self {
            BatchEvent::Progress { batch }
            | BatchEvent::Switch { batch, .. }
            | BatchEvent::Skipped { batch, .. }
            | BatchEvent::Terminal { batch } => batch,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch().id
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEvent::Terminal { .. })
    }
}
