//! Offline sample generator for dry runs
//!
//! Produces well-formed samples without network access. A configurable share
//! of calls fails with provider-style messages so that switching and circuit
//! behaviour can be watched end to end.

use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use shared::{GenerationAttempt, GenerationFailure, GenerationRequest, SampleContent, SampleGenerator};
use crate::core::prompt::{structure_headings, DifficultySpec};
use crate::error::{ProducerError, ProducerResult};

/// Messages drawn for injected failures, one per classifier category
const FAILURE_MESSAGES: &[&str] = &[
    "429 Too Many Requests: rate limit reached for requests per minute",
    "503 Service Unavailable: model is overloaded, try again later",
    "request timed out after 30s",
    "connection refused by upstream",
    "500 Internal Server Error",
];

pub struct SimulatedGenerator {
    failure_rate: f64,
    latency: Duration,
}

impl SimulatedGenerator {
    /// `failure_rate` is clamped to `[0, 1]`; NaN and infinities are rejected
    pub fn new(failure_rate: f64) -> ProducerResult<Self> {
        if !failure_rate.is_finite() {
            return Err(ProducerError::InvalidSetting {
                field: "failure_rate".to_string(),
                value: failure_rate.to_string(),
            });
        }
        Ok(Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency: Duration::from_millis(150),
        })
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn sample_body(request: &GenerationRequest) -> serde_json::Value {
        let item = &request.work_item;
        let steps = DifficultySpec::for_level(item.difficulty).min_steps;
        let reasoning: Vec<String> = (1..=steps)
            .map(|n| format!("Step {n}: principle {n} applied to the facts."))
            .collect();
        let answer: Vec<String> = structure_headings(request.sample_type)
            .iter()
            .map(|heading| format!("{heading}: simulated {} discussion.", item.subcategory))
            .collect();

        json!({
            "question": format!("Simulated {} question on {}", request.sample_type, item.key()),
            "answer": answer.join(" "),
            "reasoning": reasoning.join(" "),
            "case_citation": "Simulated v Example [2024] UKSC 1",
            "topic": item.key(),
            "difficulty": item.difficulty.to_string(),
            "sample_type": request.sample_type.to_string(),
        })
    }
}

#[async_trait]
impl SampleGenerator for SimulatedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationAttempt {
        tokio::time::sleep(self.latency).await;

        let (fail, message, tokens) = {
            let mut rng = rand::thread_rng();
            let fail = rng.gen_bool(self.failure_rate);
            let message = FAILURE_MESSAGES[rng.gen_range(0..FAILURE_MESSAGES.len())];
            (fail, message, rng.gen_range(800..2400))
        };

        if fail {
            return GenerationAttempt::failure(GenerationFailure::provider(message), self.latency);
        }

        let content = SampleContent {
            work_item: request.work_item.clone(),
            sample_type: request.sample_type,
            body: Self::sample_body(request),
        };
        GenerationAttempt::success(content, tokens, self.latency)
    }
}
