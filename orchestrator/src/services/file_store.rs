//! JSON file batch store
//!
//! Batch records live in one `batches.json` map, rewritten atomically through a
//! temporary file. Samples are appended to `samples.jsonl`. Every write goes
//! through a single lock so concurrent jobs never interleave a
//! read-modify-write.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use shared::{process_debug, BatchJob, GeneratedSample, ProcessId};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::BatchStore;

const BATCHES_FILE: &str = "batches.json";
const SAMPLES_FILE: &str = "samples.jsonl";

pub struct FileBatchStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBatchStore {
    /// Store under `./output`
    pub fn new() -> Self {
        Self::with_base_dir(PathBuf::from("./output"))
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn batches_path(&self) -> PathBuf {
        self.base_dir.join(BATCHES_FILE)
    }

    fn samples_path(&self) -> PathBuf {
        self.base_dir.join(SAMPLES_FILE)
    }

    async fn read_batches(&self) -> OrchestratorResult<BTreeMap<String, BatchJob>> {
        let path = self.batches_path();
        match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| OrchestratorError::persistence("read", format!("{}: {e}", path.display())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(OrchestratorError::persistence("read", e)),
        }
    }

    /// Caller must hold the write lock
    async fn write_batches(&self, batches: &BTreeMap<String, BatchJob>) -> OrchestratorResult<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| OrchestratorError::persistence("create_dir", e))?;

        let content = serde_json::to_string_pretty(batches)?;
        let tmp = self.base_dir.join(format!("{BATCHES_FILE}.tmp"));
        fs::write(&tmp, content)
            .await
            .map_err(|e| OrchestratorError::persistence("write", e))?;
        fs::rename(&tmp, self.batches_path())
            .await
            .map_err(|e| OrchestratorError::persistence("rename", e))?;
        Ok(())
    }

    /// Every stored sample belonging to `batch_id`, in append order
    pub async fn samples_for(&self, batch_id: &str) -> OrchestratorResult<Vec<GeneratedSample>> {
        let content = match fs::read_to_string(self.samples_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OrchestratorError::persistence("read", e)),
        };

        let mut samples = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let sample: GeneratedSample = serde_json::from_str(line)?;
            if sample.batch_id == batch_id {
                samples.push(sample);
            }
        }
        Ok(samples)
    }
}

impl Default for FileBatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchStore for FileBatchStore {
    async fn create(&self, job: &BatchJob) -> OrchestratorResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut batches = self.read_batches().await?;
        if batches.contains_key(&job.id) {
            return Err(OrchestratorError::persistence("create", format!("batch {} already exists", job.id)));
        }
        batches.insert(job.id.clone(), job.clone());
        self.write_batches(&batches).await?;

        process_debug!(ProcessId::current(), "📁 Created batch record {}", job.id);
        Ok(())
    }

    async fn update(&self, job: &BatchJob) -> OrchestratorResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut batches = self.read_batches().await?;
        batches.insert(job.id.clone(), job.clone());
        self.write_batches(&batches).await
    }

    async fn get_by_job_id(&self, batch_id: &str) -> OrchestratorResult<Option<BatchJob>> {
        Ok(self.read_batches().await?.remove(batch_id))
    }

    async fn list(&self) -> OrchestratorResult<Vec<BatchJob>> {
        Ok(self.read_batches().await?.into_values().collect())
    }

    async fn append_samples(&self, batch_id: &str, samples: &[GeneratedSample]) -> OrchestratorResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for sample in samples {
            buffer.push_str(&serde_json::to_string(sample)?);
            buffer.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| OrchestratorError::persistence("create_dir", e))?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.samples_path())
            .await
            .map_err(|e| OrchestratorError::persistence("open", e))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| OrchestratorError::persistence("append", e))?;
        file.flush().await.map_err(|e| OrchestratorError::persistence("flush", e))?;

        process_debug!(ProcessId::current(), "💾 Appended {} samples for batch {}", samples.len(), batch_id);
        Ok(())
    }
}
