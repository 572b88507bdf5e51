//! Producer-specific data types

use std::time::Duration;

/// Models that emit `<thinking>` sections and need a larger output budget
pub const THINKING_MODELS: &[&str] = &["qwen-3-235b-a22b-thinking-2507"];

/// Provider response data
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub tokens_used: u64,
    pub response_time: Duration,
}

/// Sampling parameters for one completion request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl CompletionSettings {
    /// Groq runs hotter with full nucleus; thinking models get twice the output budget
    pub fn for_target(provider: shared::ProviderId, model: &str) -> Self {
        let max_tokens = if THINKING_MODELS.contains(&model) { 8000 } else { 4000 };
        match provider {
            shared::ProviderId::Groq => Self {
                max_tokens,
                temperature: 0.9,
                top_p: 1.0,
            },
            _ => Self {
                max_tokens,
                temperature: 0.6,
                top_p: 0.95,
            },
        }
    }
}
