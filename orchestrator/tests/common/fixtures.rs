//! Test fixtures and data for orchestrator tests
//!
//! Small catalogs and provider profiles with unlimited rate limits, so only
//! the tests that care about throttling ever wait on the rate window.

use std::collections::HashMap;
use std::time::Duration;

use orchestrator::{OrchestratorConfig, TopicCatalog};
use shared::{BatchJob, Difficulty, ProviderId, ProviderProfile, RateLimits, TopicEntry};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Groq models, in fallback order
    pub const MODEL_A: &'static str = "model-a";
    pub const MODEL_B: &'static str = "model-b";
    /// The only Cerebras model
    pub const CEREBRAS_MODEL: &'static str = "cerebras-1";

    pub const VAT: &'static str = "Tax Law - VAT";
    pub const INCOME_TAX: &'static str = "Tax Law - Income Tax";

    /// Provider messages as the classifier sees them
    pub const RATE_LIMITED: &'static str = "429 Too Many Requests: slow down";
    pub const UNAUTHORIZED: &'static str = "401 Unauthorized: invalid api key";
    pub const ODD_FAILURE: &'static str = "something odd happened";
    pub const BAD_REQUEST: &'static str = "400 Bad Request: malformed payload";

    /// Two Tax Law items: VAT then Income Tax
    pub fn catalog() -> TopicCatalog {
        TopicCatalog::new(vec![
            TopicEntry::new("Tax Law", "VAT", Difficulty::Intermediate),
            TopicEntry::new("Tax Law", "Income Tax", Difficulty::Basic),
        ])
        .unwrap()
    }

    pub fn single_item_catalog() -> TopicCatalog {
        TopicCatalog::new(vec![TopicEntry::new("Tax Law", "VAT", Difficulty::Intermediate)]).unwrap()
    }

    pub fn unlimited() -> RateLimits {
        RateLimits::new(0, 0)
    }

    /// Groq (model-a, model-b) then Cerebras (cerebras-1), no rate limits
    pub fn config() -> OrchestratorConfig {
        Self::config_with(
            vec![
                ProviderProfile::new(ProviderId::Groq, Self::unlimited(), &[Self::MODEL_A, Self::MODEL_B]),
                ProviderProfile::new(ProviderId::Cerebras, Self::unlimited(), &[Self::CEREBRAS_MODEL]),
            ],
            vec![ProviderId::Groq, ProviderId::Cerebras],
        )
    }

    pub fn config_with(profiles: Vec<ProviderProfile>, order: Vec<ProviderId>) -> OrchestratorConfig {
        let profiles: HashMap<ProviderId, ProviderProfile> =
            profiles.into_iter().map(|profile| (profile.provider, profile)).collect();
        OrchestratorConfig {
            retry_delay: Duration::from_secs(2),
            provider_order: order,
            profiles,
            ..OrchestratorConfig::default()
        }
    }

    pub fn job(target: u32) -> BatchJob {
        BatchJob::new(format!("batch_0_{target:08x}"), target, ProviderId::Groq, Self::MODEL_A)
    }
}
