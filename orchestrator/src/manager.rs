//! Batch manager: the start/stop/status/history surface over running jobs
//!
//! Holds a registry of live jobs keyed by batch id. Each entry carries the
//! job's stop signal and its latest snapshot; snapshots arrive from the
//! orchestrator loops over one event channel and are forwarded to the status
//! sink from a single pump task, so per-job event order is preserved.
//!
//! Every job loop is watched by a supervisor task. It settles the terminal
//! snapshot (finalising the job itself if the loop died), then retires the
//! entry once the store holds the final record; finished jobs are served
//! from the store after that.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;

use shared::{
    process_error, process_info, process_warn, BatchEvent, BatchJob, BatchStatus, ErrorKind, ErrorRecord, ProcessId,
    SampleGenerator, StartBatchRequest,
};

use crate::config::OrchestratorConfig;
use crate::core::TopicCatalog;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::{panic_message, BatchOrchestrator, BatchServices};
use crate::traits::{BatchStore, StatusSink};

struct JobHandle {
    stop: watch::Sender<bool>,
    snapshot: watch::Sender<BatchJob>,
}

type JobRegistry = Arc<RwLock<HashMap<String, JobHandle>>>;

pub struct BatchManager {
    services: BatchServices,
    catalog: Arc<TopicCatalog>,
    jobs: JobRegistry,
    events: mpsc::UnboundedSender<BatchEvent>,
    pump: JoinHandle<()>,
}

impl BatchManager {
    /// Create a manager and spawn its event pump
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        config: OrchestratorConfig,
        catalog: TopicCatalog,
        generator: Arc<dyn SampleGenerator>,
        store: Arc<dyn BatchStore>,
        sink: Arc<dyn StatusSink>,
    ) -> OrchestratorResult<Self> {
        config.validate()?;

        let jobs: JobRegistry = Arc::new(RwLock::new(HashMap::new()));
        let (events, receiver) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump_events(receiver, Arc::clone(&jobs), sink));

        Ok(Self {
            services: BatchServices::new(config, generator, store),
            catalog: Arc::new(catalog),
            jobs,
            events,
            pump,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.services.config
    }

    pub fn catalog(&self) -> &TopicCatalog {
        &self.catalog
    }

    /// Validate a request, register the job and start its loop
    ///
    /// # Returns
    /// The new batch id; the job runs in the background
    pub async fn start(&self, request: StartBatchRequest) -> OrchestratorResult<String> {
        if request.target == 0 {
            return Err(OrchestratorError::invalid_request("target must be at least 1"));
        }

        let selector = &self.services.selector;
        let provider = match request.provider {
            Some(provider) => provider,
            None => *selector
                .provider_order()
                .first()
                .ok_or_else(|| OrchestratorError::invalid_request("no providers configured"))?,
        };
        let model = match request.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => model.to_string(),
            None => selector
                .default_model(provider)
                .map(str::to_string)
                .ok_or_else(|| OrchestratorError::invalid_request(format!("provider {provider} has no models configured")))?,
        };

        let cycle = self
            .catalog
            .work_cycle(request.topic.as_deref(), request.difficulty, request.sample_type)?;

        let job = BatchJob::new(new_batch_id(), request.target, provider, model).with_filters(
            request.topic.clone(),
            request.difficulty,
            request.sample_type,
        );
        let batch_id = job.id.clone();
        let cycle_len = cycle.len();

        if let Err(e) = self.services.store.create(&job).await {
            process_warn!(ProcessId::current(), "💾 Could not record new batch {}: {}", batch_id, e);
        }

        let (stop, stop_rx) = watch::channel(false);
        let (snapshot, _) = watch::channel(job.clone());

        // Registered before spawning so the first event finds its entry
        let mut jobs = self.jobs.write().await;
        let orchestrator = BatchOrchestrator::new(job, cycle, self.services.clone(), self.events.clone(), stop_rx);
        let task = tokio::spawn(orchestrator.run());
        jobs.insert(batch_id.clone(), JobHandle { stop, snapshot });
        drop(jobs);
        tokio::spawn(supervise(
            batch_id.clone(),
            task,
            Arc::clone(&self.jobs),
            Arc::clone(&self.services.store),
            self.events.clone(),
        ));

        process_info!(
            ProcessId::current(),
            "📋 Started batch {} ({} samples, {} items in cycle)",
            batch_id,
            request.target,
            cycle_len
        );
        Ok(batch_id)
    }

    /// Request stop of one batch, or of every running batch when `batch_id` is None
    ///
    /// Stopping a finished batch is a no-op. A stored record that claims to be
    /// running but has no live job (left over from a crash) is marked stopped.
    pub async fn stop(&self, batch_id: Option<&str>) -> OrchestratorResult<Vec<String>> {
        let jobs = self.jobs.read().await;

        let Some(batch_id) = batch_id else {
            let mut stopped = Vec::new();
            for (id, handle) in jobs.iter() {
                if !handle.snapshot.borrow().is_terminal() {
                    handle.stop.send_replace(true);
                    stopped.push(id.clone());
                }
            }
            stopped.sort();
            process_info!(ProcessId::current(), "🛑 Stop requested for {} running batches", stopped.len());
            return Ok(stopped);
        };

        if let Some(handle) = jobs.get(batch_id) {
            if handle.snapshot.borrow().is_terminal() {
                return Ok(Vec::new());
            }
            handle.stop.send_replace(true);
            process_info!(ProcessId::current(), "🛑 Stop requested for batch {}", batch_id);
            return Ok(vec![batch_id.to_string()]);
        }
        drop(jobs);

        self.recover_stale(batch_id).await
    }

    async fn recover_stale(&self, batch_id: &str) -> OrchestratorResult<Vec<String>> {
        let Some(mut job) = self.services.store.get_by_job_id(batch_id).await? else {
            return Err(OrchestratorError::BatchNotFound {
                batch_id: batch_id.to_string(),
            });
        };
        if job.is_terminal() {
            return Ok(Vec::new());
        }

        job.finish(BatchStatus::Stopped);
        self.services.store.update(&job).await?;
        process_warn!(ProcessId::current(), "🧹 Marked orphaned batch {} as stopped", batch_id);
        Ok(vec![batch_id.to_string()])
    }

    /// Snapshot of one batch (live first, then store), or of the most recent batch
    pub async fn status(&self, batch_id: Option<&str>) -> OrchestratorResult<Option<BatchJob>> {
        let Some(id) = batch_id else {
            return Ok(self.history().await?.into_iter().next());
        };

        if let Some(handle) = self.jobs.read().await.get(id) {
            return Ok(Some(handle.snapshot.borrow().clone()));
        }
        self.services.store.get_by_job_id(id).await
    }

    /// Number of jobs still held in the registry (running or not yet retired)
    pub async fn active_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Every known batch, newest first; live snapshots win over stored ones
    pub async fn history(&self) -> OrchestratorResult<Vec<BatchJob>> {
        let mut merged: HashMap<String, BatchJob> = match self.services.store.list().await {
            Ok(stored) => stored.into_iter().map(|job| (job.id.clone(), job)).collect(),
            Err(e) => {
                process_error!(ProcessId::current(), "💾 Could not list stored batches: {}", e);
                HashMap::new()
            }
        };

        for (id, handle) in self.jobs.read().await.iter() {
            merged.insert(id.clone(), handle.snapshot.borrow().clone());
        }

        let mut batches: Vec<BatchJob> = merged.into_values().collect();
        batches.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        Ok(batches)
    }

    /// Wait for a batch to reach a terminal status
    ///
    /// A batch already retired from the registry resolves from its stored record.
    pub async fn wait(&self, batch_id: &str) -> OrchestratorResult<BatchJob> {
        let receiver = self.jobs.read().await.get(batch_id).map(|handle| handle.snapshot.subscribe());
        let not_found = || OrchestratorError::BatchNotFound {
            batch_id: batch_id.to_string(),
        };

        let Some(mut receiver) = receiver else {
            return match self.services.store.get_by_job_id(batch_id).await? {
                Some(job) if job.is_terminal() => Ok(job),
                _ => Err(not_found()),
            };
        };

        // The supervisor always settles a terminal snapshot before retiring the entry
        let job = receiver
            .wait_for(BatchJob::is_terminal)
            .await
            .map(|job| job.clone())
            .map_err(|_| not_found())?;
        Ok(job)
    }

    /// Stop every running batch and wait for all of them to finish
    pub async fn shutdown(&self) -> Vec<BatchJob> {
        let stopped = self.stop(None).await.unwrap_or_default();
        process_info!(ProcessId::current(), "🛑 Shutting down batch manager ({} running)", stopped.len());

        let ids: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        let mut finished = Vec::new();
        for id in ids {
            match self.wait(&id).await {
                Ok(job) => finished.push(job),
                Err(e) => process_warn!(ProcessId::current(), "Batch {} did not report completion: {}", id, e),
            }
        }
        finished
    }
}

impl Drop for BatchManager {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Apply snapshots to the registry and forward every event to the sink
async fn pump_events(
    mut receiver: mpsc::UnboundedReceiver<BatchEvent>,
    jobs: JobRegistry,
    sink: Arc<dyn StatusSink>,
) {
    while let Some(event) = receiver.recv().await {
        if let Some(handle) = jobs.read().await.get(event.batch_id()) {
            let incoming = event.batch().clone();
            handle.snapshot.send_if_modified(|current| {
                // A terminal snapshot is final
                if current.is_terminal() {
                    return false;
                }
                *current = incoming;
                true
            });
        }
        sink.publish(event);
    }
}

/// Await one job loop, settle its terminal snapshot and retire it
///
/// A loop that panicked never ran its finalisation, so the job is finished
/// here from its last snapshot: marked exhausted with a fatal `aborted`
/// record, persisted and announced with a terminal event.
async fn supervise(
    batch_id: String,
    task: JoinHandle<BatchJob>,
    jobs: JobRegistry,
    store: Arc<dyn BatchStore>,
    events: mpsc::UnboundedSender<BatchEvent>,
) {
    let (job, aborted) = match task.await {
        Ok(job) => (job, false),
        Err(e) => {
            let reason = if e.is_panic() {
                format!("batch loop panicked: {}", panic_message(e.into_panic().as_ref()))
            } else {
                "batch loop was cancelled".to_string()
            };
            process_error!(ProcessId::current(), "💥 Batch {}: {}", batch_id, reason);

            let Some(mut job) = jobs.read().await.get(&batch_id).map(|handle| handle.snapshot.borrow().clone()) else {
                return;
            };
            job.record_error(ErrorRecord::new(ErrorKind::Aborted, reason).fatal());
            job.finish(BatchStatus::Exhausted);
            (job, true)
        }
    };

    // The pump may not have applied the terminal event yet; the loop's result is authoritative
    if let Some(handle) = jobs.read().await.get(&batch_id) {
        handle.snapshot.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = job.clone();
            true
        });
    }

    if aborted {
        if let Err(e) = store.update(&job).await {
            process_error!(ProcessId::current(), "💾 Could not record aborted batch {}: {}", batch_id, e);
        }
        // The pump is gone only when the manager is; nothing is listening then
        let _ = events.send(BatchEvent::Terminal { batch: job });
    }

    match store.get_by_job_id(&batch_id).await {
        Ok(Some(stored)) if stored.is_terminal() => {
            jobs.write().await.remove(&batch_id);
        }
        Ok(_) => process_warn!(
            ProcessId::current(),
            "Batch {} final record not stored; keeping it in memory",
            batch_id
        ),
        Err(e) => process_warn!(ProcessId::current(), "Batch {} final record unreadable: {}", batch_id, e),
    }
}

/// `batch_<unix seconds>_<8 hex chars>`
fn new_batch_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("batch_{}_{}", chrono::Utc::now().timestamp(), &suffix[..8])
}
