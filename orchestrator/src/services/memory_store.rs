//! In-memory batch store for dry runs and tests

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use shared::{BatchJob, GeneratedSample};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::BatchStore;

#[derive(Default)]
struct Contents {
    batches: HashMap<String, BatchJob>,
    samples: Vec<GeneratedSample>,
}

#[derive(Default)]
pub struct InMemoryBatchStore {
    contents: Mutex<Contents>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn samples_for(&self, batch_id: &str) -> Vec<GeneratedSample> {
        let contents = self.contents.lock().await;
        contents
            .samples
            .iter()
            .filter(|sample| sample.batch_id == batch_id)
            .cloned()
            .collect()
    }

    pub async fn sample_count(&self) -> usize {
        self.contents.lock().await.samples.len()
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn create(&self, job: &BatchJob) -> OrchestratorResult<()> {
        let mut contents = self.contents.lock().await;
        if contents.batches.contains_key(&job.id) {
            return Err(OrchestratorError::persistence("create", format!("batch {} already exists", job.id)));
        }
        contents.batches.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update(&self, job: &BatchJob) -> OrchestratorResult<()> {
        self.contents.lock().await.batches.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_by_job_id(&self, batch_id: &str) -> OrchestratorResult<Option<BatchJob>> {
        Ok(self.contents.lock().await.batches.get(batch_id).cloned())
    }

    async fn list(&self) -> OrchestratorResult<Vec<BatchJob>> {
        Ok(self.contents.lock().await.batches.values().cloned().collect())
    }

    async fn append_samples(&self, _batch_id: &str, samples: &[GeneratedSample]) -> OrchestratorResult<()> {
        self.contents.lock().await.samples.extend_from_slice(samples);
        Ok(())
    }
}
