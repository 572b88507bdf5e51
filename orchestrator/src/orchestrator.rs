//! Batch orchestrator: drives one job from start to a terminal status
//!
//! Each job gets its own `BatchOrchestrator`, which owns the live `BatchJob`
//! and is the only thing that mutates it. Everyone else sees snapshots sent
//! over the event channel.

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use shared::{
    process_debug, process_error, process_info, process_warn, BatchEvent, BatchJob, BatchStatus, CircuitState,
    ErrorCategory, ErrorKind, ErrorRecord, FailureKind, GeneratedSample, GenerationAttempt, GenerationFailure,
    GenerationRequest, ProcessId, SampleContent, SampleGenerator, SampleType, SwitchKind, SwitchRecord, WorkItem,
};

use crate::config::OrchestratorConfig;
use crate::core::{CircuitBreaker, ErrorClassifier, FallbackSelector, RateWindow, WorkCycle};
use crate::traits::BatchStore;

/// Collaborators shared by every job of a manager
#[derive(Clone)]
pub struct BatchServices {
    pub config: Arc<OrchestratorConfig>,
    pub selector: Arc<FallbackSelector>,
    pub classifier: Arc<ErrorClassifier>,
    pub generator: Arc<dyn SampleGenerator>,
    pub store: Arc<dyn BatchStore>,
}

impl BatchServices {
    pub fn new(config: OrchestratorConfig, generator: Arc<dyn SampleGenerator>, store: Arc<dyn BatchStore>) -> Self {
        let selector = Arc::new(config.selector());
        Self {
            config: Arc::new(config),
            selector,
            classifier: Arc::new(ErrorClassifier::default()),
            generator,
            store,
        }
    }
}

/// How one work item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Generated,
    Abandoned,
    Interrupted,
    Exhausted,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureAction {
    Retry,
    Switched,
    Exhausted,
}

pub struct BatchOrchestrator {
    job: BatchJob,
    cycle: WorkCycle,
    services: BatchServices,
    breaker: CircuitBreaker,
    window: RateWindow,
    buffer: Vec<GeneratedSample>,
    events: mpsc::UnboundedSender<BatchEvent>,
    stop: watch::Receiver<bool>,
}

impl BatchOrchestrator {
    pub fn new(
        job: BatchJob,
        cycle: WorkCycle,
        services: BatchServices,
        events: mpsc::UnboundedSender<BatchEvent>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        let breaker = CircuitBreaker::new(services.config.circuit);
        let window = RateWindow::new(services.selector.rate_limits(job.provider));
        Self {
            job,
            cycle,
            services,
            breaker,
            window,
            buffer: Vec::new(),
            events,
            stop,
        }
    }

    /// Run the generation loop to completion and return the terminal snapshot
    pub async fn run(mut self) -> BatchJob {
        self.job.mark_running();
        self.persist("start").await;
        self.emit_progress();

        process_info!(
            ProcessId::current(),
            "🚀 Batch {} started: target {} on {}/{}",
            self.job.id,
            self.job.target,
            self.job.provider,
            self.job.model
        );

        let started = Instant::now();
        let max_iterations =
            u64::from(self.job.samples_needed()) * u64::from(self.services.config.retry_multiplier);

        let status = loop {
            if self.job.samples_generated >= self.job.target {
                break BatchStatus::Completed;
            }
            if self.stop_requested() {
                break BatchStatus::Stopped;
            }
            if started.elapsed() > self.services.config.max_batch_timeout {
                let limit = self.services.config.max_batch_timeout.as_secs();
                self.job.record_error(
                    ErrorRecord::new(ErrorKind::Timeout, format!("batch exceeded its {limit}s time limit")).fatal(),
                );
                break BatchStatus::TimedOut;
            }
            if self.job.iterations >= max_iterations {
                self.job.record_error(
                    ErrorRecord::new(
                        ErrorKind::IterationBudget,
                        format!(
                            "iteration budget of {max_iterations} spent with {}/{} samples",
                            self.job.samples_generated, self.job.target
                        ),
                    )
                    .fatal(),
                );
                break BatchStatus::Exhausted;
            }

            let (item, sample_type) = {
                let (item, sample_type) = self.cycle.at(self.job.iterations);
                (item.clone(), sample_type)
            };
            let key = item.key();

            if self.breaker.is_open(&key) {
                process_debug!(ProcessId::current(), "⏭️  Skipping {} (circuit open)", key);
                self.job.skipped_items.insert(key.clone());
                self.job.iterations += 1;
                self.emit(|batch| BatchEvent::Skipped { work_item: key, batch });
                if self.all_items_open() {
                    self.wait_for_probe().await;
                }
                continue;
            }

            self.job.current_item = Some(key.clone());
            if self.attempt_item(&item, sample_type, &key).await == ItemOutcome::Exhausted {
                break BatchStatus::Exhausted;
            }
            self.job.iterations += 1;
        };

        self.finalize(status).await
    }

    /// Bounded local retry of a single work item
    async fn attempt_item(&mut self, item: &WorkItem, sample_type: SampleType, key: &str) -> ItemOutcome {
        let max_retries = self.services.config.max_sample_retries;
        let mut retries = 0;

        while retries < max_retries {
            if self.stop_requested() {
                return ItemOutcome::Interrupted;
            }
            if self.breaker.is_open(key) {
                return ItemOutcome::Abandoned;
            }
            if !self.throttle().await {
                return ItemOutcome::Interrupted;
            }

            let attempt = self.call_generator(item, sample_type).await;
            match attempt.outcome {
                Ok(content) => {
                    self.on_success(content, attempt.tokens_used, key).await;
                    return ItemOutcome::Generated;
                }
                Err(failure) => {
                    retries += 1;
                    match self.on_failure(&failure, key).await {
                        FailureAction::Exhausted => return ItemOutcome::Exhausted,
                        FailureAction::Switched => continue,
                        FailureAction::Retry => {
                            let delay = self.services.config.retry_delay;
                            if retries < max_retries && !self.pause(delay).await {
                                return ItemOutcome::Interrupted;
                            }
                        }
                    }
                }
            }
        }

        process_debug!(ProcessId::current(), "Abandoning {} after {} attempts", key, retries);
        ItemOutcome::Abandoned
    }

    async fn call_generator(&mut self, item: &WorkItem, sample_type: SampleType) -> GenerationAttempt {
        let request = GenerationRequest {
            batch_id: self.job.id.clone(),
            work_item: item.clone(),
            sample_type,
            provider: self.job.provider,
            model: self.job.model.clone(),
        };

        let timeout = self.services.config.generation_timeout;
        let called_at = Instant::now();
        // A panicking generator is one failed call, not a dead job
        let generation = AssertUnwindSafe(self.services.generator.generate(&request)).catch_unwind();
        let attempt = match tokio::time::timeout(timeout, generation).await {
            Ok(Ok(attempt)) => attempt,
            Ok(Err(panic)) => GenerationAttempt::failure(
                GenerationFailure::provider(format!("sample generator panicked: {}", panic_message(panic.as_ref()))),
                called_at.elapsed(),
            ),
            Err(_) => GenerationAttempt::failure(
                GenerationFailure::provider(format!("generation request timed out after {}s", timeout.as_secs())),
                timeout,
            ),
        };
        self.window.record(called_at, attempt.tokens_used);
        attempt
    }

    async fn on_success(&mut self, content: SampleContent, tokens: u64, key: &str) {
        let sample = GeneratedSample::stamp(content, &self.job.id, self.job.provider, &self.job.model, tokens);
        self.buffer.push(sample);
        self.job.record_success(tokens);
        self.breaker.record_success(key);

        if self.job.samples_generated % self.services.config.checkpoint_interval == 0 {
            self.checkpoint().await;
        }
        self.emit_progress();
    }

    async fn on_failure(&mut self, failure: &GenerationFailure, key: &str) -> FailureAction {
        let (kind, category) = match failure.kind {
            FailureKind::Provider => (ErrorKind::Provider, self.services.classifier.classify(&failure.message)),
            FailureKind::ContentValidation => (ErrorKind::ContentValidation, ErrorCategory::General),
        };

        self.job.consecutive_failures += 1;
        self.breaker.record_failure(key, &failure.message);

        let mut record = ErrorRecord::new(kind, failure.message.clone())
            .with_work_item(key)
            .with_target(self.job.provider, &self.job.model);
        if kind == ErrorKind::Provider {
            record = record.with_category(category);
        }
        self.job.record_error(record);

        process_warn!(
            ProcessId::current(),
            "⚠️  {}/{} failed on {} [{}]: {}",
            self.job.provider,
            self.job.model,
            key,
            category,
            failure.message
        );
        if category == ErrorCategory::BadRequest {
            process_warn!(ProcessId::current(), "Malformed request reported by {}; not switching for it", self.job.provider);
        }

        let immediate = self.services.classifier.requires_immediate_switch(category);
        if !immediate && self.job.consecutive_failures < self.services.config.failure_threshold {
            return FailureAction::Retry;
        }

        let reason = if immediate {
            format!("{category}: {}", failure.message)
        } else {
            format!("{} consecutive failures: {}", self.job.consecutive_failures, failure.message)
        };
        self.switch_target(reason, category).await
    }

    async fn switch_target(&mut self, reason: String, category: ErrorCategory) -> FailureAction {
        let from_provider = self.job.provider;
        let from_model = self.job.model.clone();
        self.job.mark_model_failed(from_provider, &from_model);

        let next = self
            .services
            .selector
            .next_provider_and_model(from_provider, &from_model, &self.job.failed_models_by_provider);

        let Some((to_provider, to_model)) = next else {
            process_error!(ProcessId::current(), "❌ Batch {}: all providers and models exhausted", self.job.id);
            self.job.record_error(
                ErrorRecord::new(ErrorKind::Exhaustion, format!("all providers and models exhausted; last error: {reason}"))
                    .with_target(from_provider, &from_model)
                    .fatal(),
            );
            return FailureAction::Exhausted;
        };

        let kind = if to_provider == from_provider {
            SwitchKind::Model
        } else {
            SwitchKind::Provider
        };
        let record = SwitchRecord {
            kind,
            from_provider,
            to_provider,
            from_model,
            to_model,
            reason,
            category: Some(category),
            samples_generated: self.job.samples_generated,
            timestamp: chrono::Utc::now(),
        };

        process_info!(
            ProcessId::current(),
            "🔀 Batch {}: {}/{} → {}/{} ({})",
            self.job.id,
            record.from_provider,
            record.from_model,
            record.to_provider,
            record.to_model,
            record.reason
        );

        self.job.record_switch(record.clone());
        if kind == SwitchKind::Provider {
            self.window.reconfigure(self.services.selector.rate_limits(to_provider));
        }
        self.persist("switch").await;
        self.emit(|batch| BatchEvent::Switch { record, batch });
        FailureAction::Switched
    }

    /// Wait until the rate window admits another call; false if stopped meanwhile
    async fn throttle(&mut self) -> bool {
        loop {
            let Some(wait) = self.window.wait_time(Instant::now()) else {
                return true;
            };
            process_debug!(
                ProcessId::current(),
                "⏳ {} rate window full, waiting {:.1}s",
                self.job.provider,
                wait.as_secs_f64()
            );
            if !self.pause(wait).await {
                return false;
            }
        }
    }

    fn all_items_open(&self) -> bool {
        self.cycle
            .items()
            .iter()
            .all(|item| self.breaker.state(&item.key()) == CircuitState::Open)
    }

    async fn wait_for_probe(&mut self) {
        if let Some(at) = self.breaker.next_probe_at() {
            let wait = at.saturating_duration_since(Instant::now());
            process_info!(
                ProcessId::current(),
                "⏸️  Batch {}: every work item is circuit-open, waiting {}s",
                self.job.id,
                wait.as_secs()
            );
            self.pause(wait).await;
        }
    }

    /// Sleep unless a stop arrives first; returns false when stopped
    async fn pause(&mut self, duration: Duration) -> bool {
        if !duration.is_zero() {
            let stop = &mut self.stop;
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = stop.wait_for(|stopped| *stopped) => {}
            }
        }
        !self.stop_requested()
    }

    fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    /// Write buffered samples; the buffer is cleared only after a durable write
    async fn flush_buffer(&mut self) -> bool {
        if self.buffer.is_empty() {
            return true;
        }
        match self.services.store.append_samples(&self.job.id, &self.buffer).await {
            Ok(()) => {
                self.job.samples_persisted += self.buffer.len() as u32;
                self.buffer.clear();
                true
            }
            Err(e) => {
                process_error!(ProcessId::current(), "💾 Batch {}: sample flush failed: {}", self.job.id, e);
                self.job.record_error(ErrorRecord::new(ErrorKind::Persistence, e.to_string()));
                false
            }
        }
    }

    async fn checkpoint(&mut self) {
        if self.flush_buffer().await && self.persist("checkpoint").await {
            shared::logging::log_progress(
                ProcessId::current(),
                &format!("Checkpoint {}", self.job.id),
                &format!("{}/{} samples", self.job.samples_generated, self.job.target),
            );
        }
    }

    async fn persist(&mut self, operation: &str) -> bool {
        self.job.circuit_breakers = self.breaker.summary();
        match self.services.store.update(&self.job).await {
            Ok(()) => true,
            Err(e) => {
                process_error!(
                    ProcessId::current(),
                    "💾 Batch {}: {} update failed: {}",
                    self.job.id,
                    operation,
                    e
                );
                false
            }
        }
    }

    async fn finalize(mut self, status: BatchStatus) -> BatchJob {
        let attempts = self.services.config.final_flush_attempts.max(1);

        for attempt in 1..=attempts {
            if self.flush_buffer().await {
                break;
            }
            if attempt < attempts {
                tokio::time::sleep(self.services.config.retry_delay).await;
            }
        }

        self.job.circuit_breakers = self.breaker.summary();
        self.job.finish(status);

        for attempt in 1..=attempts {
            if self.persist("final").await {
                break;
            }
            if attempt < attempts {
                tokio::time::sleep(self.services.config.retry_delay).await;
            }
        }

        self.emit(|batch| BatchEvent::Terminal { batch });
        process_info!(
            ProcessId::current(),
            "🏁 Batch {} {}: {}/{} samples, {} tokens, {} switches, {} errors",
            self.job.id,
            self.job.status,
            self.job.samples_generated,
            self.job.target,
            self.job.total_tokens,
            self.job.switch_count(),
            self.job.errors.len()
        );
        self.job
    }

    fn emit_progress(&mut self) {
        self.emit(|batch| BatchEvent::Progress { batch });
    }

    fn emit<F>(&mut self, build: F)
    where
        F: FnOnce(BatchJob) -> BatchEvent,
    {
        self.job.circuit_breakers = self.breaker.summary();
        // Receiver gone means nobody is watching; the job carries on
        let _ = self.events.send(build(self.job.clone()));
    }
}

/// Text of a panic payload, when it carries one
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
