//! Producer trait definitions for dependency injection

use async_trait::async_trait;

use shared::ProviderId;
use crate::error::ProducerResult;
use crate::types::{CompletionSettings, ProviderResponse};

/// Raw completion call against one provider/model
#[mockall::automock]
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Send a single-turn prompt and return the model's text
    async fn complete(
        &self,
        provider: ProviderId,
        model: &str,
        prompt: &str,
        settings: CompletionSettings,
    ) -> ProducerResult<ProviderResponse>;
}
