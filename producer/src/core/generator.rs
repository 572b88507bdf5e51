//! Sample generator backed by a remote provider

use std::time::Instant;
use async_trait::async_trait;

use shared::{
    process_debug, GenerationAttempt, GenerationFailure, GenerationRequest, ProcessId, SampleContent,
    SampleGenerator,
};
use crate::core::processor::process_response;
use crate::core::prompt::build_prompt;
use crate::traits::ApiClient;
use crate::types::CompletionSettings;

/// Builds the prompt, calls the provider and validates what comes back
pub struct LlmSampleGenerator<A: ApiClient> {
    client: A,
}

impl<A: ApiClient> LlmSampleGenerator<A> {
    pub fn new(client: A) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<A: ApiClient> SampleGenerator for LlmSampleGenerator<A> {
    async fn generate(&self, request: &GenerationRequest) -> GenerationAttempt {
        let started = Instant::now();
        let prompt = build_prompt(&request.work_item, request.sample_type);
        let settings = CompletionSettings::for_target(request.provider, &request.model);

        let response = match self
            .client
            .complete(request.provider, &request.model, &prompt, settings)
            .await
        {
            Ok(response) => response,
            Err(e) => return GenerationAttempt::failure(GenerationFailure::provider(e.to_string()), started.elapsed()),
        };

        match process_response(&response.content, &request.work_item, request.sample_type) {
            Ok(body) => {
                process_debug!(
                    ProcessId::current(),
                    "✍️ {}/{} produced {} for {} ({} tokens)",
                    request.provider,
                    request.model,
                    request.sample_type,
                    request.work_item.key(),
                    response.tokens_used
                );
                GenerationAttempt::success(
                    SampleContent {
                        work_item: request.work_item.clone(),
                        sample_type: request.sample_type,
                        body,
                    },
                    response.tokens_used,
                    started.elapsed(),
                )
            }
            Err(e) => GenerationAttempt::failure(GenerationFailure::content(e.to_string()), started.elapsed()),
        }
    }
}
