//! Test helpers for driving batch jobs
//!
//! `ScriptedGenerator` decides each call's outcome with a closure and records
//! every call with its (paused-clock) start time, so tests can assert on what
//! the orchestrator asked for and when.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use orchestrator::{BatchOrchestrator, BatchServices, InMemoryBatchStore, OrchestratorConfig, WorkCycle};
use orchestrator::traits::BatchStore;
use shared::{
    BatchEvent, BatchJob, GenerationAttempt, GenerationFailure, GenerationRequest, ProviderId, SampleContent,
    SampleGenerator, SampleType, SampleTypeFilter,
};

use super::fixtures::TestFixtures;

/// What one scripted call does
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(u64),
    ProviderError(String),
    ContentError(String),
    /// Never returns; only the caller's timeout ends it
    Hang,
    /// Panics inside the generator
    Panic(&'static str),
}

#[derive(Debug, Clone)]
pub struct CallRecord {
    pub at: Instant,
    pub provider: ProviderId,
    pub model: String,
    pub item: String,
    pub sample_type: SampleType,
}

type Responder = Box<dyn Fn(&GenerationRequest, usize) -> Outcome + Send + Sync>;

pub struct ScriptedGenerator {
    responder: Responder,
    latency: Duration,
    calls: Mutex<Vec<CallRecord>>,
}

impl ScriptedGenerator {
    /// Outcome chosen per call from the request and the zero-based call index
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerationRequest, usize) -> Outcome + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(|_, _| Outcome::Success(100))
    }

    /// Fail every call to `model` with a provider error, succeed elsewhere
    pub fn failing_model(model: &'static str, message: &'static str) -> Self {
        Self::new(move |request, _| {
            if request.model == model {
                Outcome::ProviderError(message.to_string())
            } else {
                Outcome::Success(100)
            }
        })
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for_item(&self, item: &str) -> Vec<CallRecord> {
        self.calls().into_iter().filter(|call| call.item == item).collect()
    }
}

#[async_trait::async_trait]
impl SampleGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationAttempt {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(CallRecord {
                at: Instant::now(),
                provider: request.provider,
                model: request.model.clone(),
                item: request.work_item.key(),
                sample_type: request.sample_type,
            });
            calls.len() - 1
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match (self.responder)(request, index) {
            Outcome::Success(tokens) => GenerationAttempt::success(TestHelpers::content_for(request), tokens, self.latency),
            Outcome::ProviderError(message) => {
                GenerationAttempt::failure(GenerationFailure::provider(message), self.latency)
            }
            Outcome::ContentError(message) => GenerationAttempt::failure(GenerationFailure::content(message), self.latency),
            Outcome::Hang => std::future::pending().await,
            Outcome::Panic(message) => panic!("{message}"),
        }
    }
}

pub struct TestHelpers;

impl TestHelpers {
    pub fn content_for(request: &GenerationRequest) -> SampleContent {
        SampleContent {
            work_item: request.work_item.clone(),
            sample_type: request.sample_type,
            body: serde_json::json!({
                "question": format!("Question on {}", request.work_item.subcategory),
                "answer": "Answer",
                "reasoning": "Step 1: facts. Step 2: law. Step 3: apply. Step 4: conclude.",
                "case_citation": "Donoghue v Stevenson [1932] AC 562",
            }),
        }
    }

    pub fn services(
        config: OrchestratorConfig,
        generator: Arc<dyn SampleGenerator>,
        store: Arc<dyn BatchStore>,
    ) -> BatchServices {
        BatchServices::new(config, generator, store)
    }

    /// Balanced cycle over the two-item fixture catalog
    pub fn cycle() -> WorkCycle {
        TestFixtures::catalog().work_cycle(None, None, SampleTypeFilter::Balance).unwrap()
    }

    pub fn single_item_cycle() -> WorkCycle {
        TestFixtures::single_item_catalog()
            .work_cycle(None, None, SampleTypeFilter::Balance)
            .unwrap()
    }

    pub fn memory_store() -> Arc<InMemoryBatchStore> {
        Arc::new(InMemoryBatchStore::new())
    }

    /// Exactly one terminal event, and it is the last one
    pub fn assert_single_terminal(events: &[BatchEvent]) {
        let terminals = events.iter().filter(|event| event.is_terminal()).count();
        assert_eq!(terminals, 1, "expected exactly one terminal event");
        assert!(events.last().is_some_and(BatchEvent::is_terminal), "terminal event must be last");
    }
}

/// Run one job to completion with a stop signal nobody sends
pub async fn run_job(services: BatchServices, job: BatchJob, cycle: WorkCycle) -> (BatchJob, Vec<BatchEvent>) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (_stop_tx, stop_rx) = watch::channel(false);

    let job = BatchOrchestrator::new(job, cycle, services, events_tx, stop_rx).run().await;

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    (job, events)
}
