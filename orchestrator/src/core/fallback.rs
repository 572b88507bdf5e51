//! Provider fallback selection
//!
//! Answers "what should be tried next" from static provider profiles. Within a
//! provider models are tried in list order; across providers the order is
//! fixed once at construction. The selector keeps no state of its own: callers
//! pass in the models they have already given up on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use shared::{ProviderId, ProviderProfile, RateLimits};

/// Models already proven bad for a job, per provider
pub type TriedModels = BTreeMap<ProviderId, BTreeSet<String>>;

/// Default fallback priority across providers
pub const DEFAULT_PROVIDER_ORDER: [ProviderId; 5] = [
    ProviderId::Cerebras,
    ProviderId::Mistral,
    ProviderId::Google,
    ProviderId::Groq,
    ProviderId::Ollama,
];

/// Built-in profile for a provider
pub fn default_profile(provider: ProviderId) -> ProviderProfile {
    match provider {
        ProviderId::Groq => ProviderProfile::new(
            provider,
            RateLimits::new(25, 5_500),
            &[
                "llama-3.3-70b-versatile",
                "llama-3.1-8b-instant",
                "openai/gpt-oss-120b",
                "openai/gpt-oss-20b",
            ],
        ),
        ProviderId::Cerebras => ProviderProfile::new(
            provider,
            RateLimits::new(600, 48_000),
            &[
                "gpt-oss-120b",
                "llama-3.3-70b",
                "qwen-3-235b-a22b-thinking-2507",
                "qwen-3-235b-a22b-instruct-2507",
                "llama-4-maverick-17b-128e-instruct",
                "qwen-3-32b",
                "llama-4-scout-17b-16e-instruct",
                "llama3.1-8b",
            ],
        ),
        ProviderId::Ollama => ProviderProfile::new(
            provider,
            RateLimits::new(60, 10_000),
            &[
                "kimi-k2:1t-cloud",
                "deepseek-v3.1:671b-cloud",
                "qwen3-coder:480b-cloud",
                "gpt-oss:120b-cloud",
                "gpt-oss:20b-cloud",
            ],
        ),
        ProviderId::Google => ProviderProfile::new(
            provider,
            RateLimits::new(2, 125_000),
            &[
                "gemini-2.5-pro",
                "gemini-2.5-flash",
                "gemini-2.5-flash-lite",
                "gemini-2.0-flash",
                "gemini-2.0-flash-lite",
            ],
        ),
        ProviderId::Mistral => ProviderProfile::new(
            provider,
            RateLimits::new(60, 32_000),
            &[
                "mistral-large-2411",
                "mistral-medium-2508",
                "magistral-medium-2509",
                "codestral-2508",
                "mistral-small-2407",
                "ministral-8b-2410",
            ],
        ),
    }
}

#[derive(Debug, Clone)]
pub struct FallbackSelector {
    profiles: HashMap<ProviderId, ProviderProfile>,
    order: Vec<ProviderId>,
}

impl FallbackSelector {
    /// Build from explicit profiles; providers without a profile get the built-in one
    pub fn new(profiles: Vec<ProviderProfile>, order: Vec<ProviderId>) -> Self {
        let mut by_provider: HashMap<ProviderId, ProviderProfile> =
            ProviderId::ALL.iter().map(|p| (*p, default_profile(*p))).collect();
        for profile in profiles {
            by_provider.insert(profile.provider, profile);
        }

        let mut seen = BTreeSet::new();
        let order = order.into_iter().filter(|p| seen.insert(*p)).collect();

        Self {
            profiles: by_provider,
            order,
        }
    }

    pub fn profile(&self, provider: ProviderId) -> Option<&ProviderProfile> {
        self.profiles.get(&provider)
    }

    pub fn provider_order(&self) -> &[ProviderId] {
        &self.order
    }

    pub fn default_model(&self, provider: ProviderId) -> Option<&str> {
        self.profile(provider).and_then(ProviderProfile::default_model)
    }

    pub fn rate_limits(&self, provider: ProviderId) -> RateLimits {
        self.profiles
            .get(&provider)
            .map(|profile| profile.limits)
            .unwrap_or_else(|| default_profile(provider).limits)
    }

    /// First model of `provider` that is neither tried nor the current one
    pub fn next_model(&self, provider: ProviderId, current_model: &str, tried: &BTreeSet<String>) -> Option<String> {
        self.profile(provider)?
            .models
            .iter()
            .find(|model| model.as_str() != current_model && !tried.contains(model.as_str()))
            .cloned()
    }

    /// Next (provider, model) after exhausting the current provider
    ///
    /// Returns `None` only when every model of every provider in the order
    /// (plus the current provider) has been tried.
    pub fn next_provider_and_model(
        &self,
        current_provider: ProviderId,
        current_model: &str,
        tried_by_provider: &TriedModels,
    ) -> Option<(ProviderId, String)> {
        let empty = BTreeSet::new();
        let tried_for = |provider: &ProviderId| tried_by_provider.get(provider).unwrap_or(&empty);

        if let Some(model) = self.next_model(current_provider, current_model, tried_for(&current_provider)) {
            return Some((current_provider, model));
        }

        self.order
            .iter()
            .filter(|provider| **provider != current_provider)
            .find_map(|provider| {
                self.next_model(*provider, "", tried_for(provider))
                    .map(|model| (*provider, model))
            })
    }
}

impl Default for FallbackSelector {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_PROVIDER_ORDER.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tried(entries: &[(ProviderId, &[&str])]) -> TriedModels {
        entries
            .iter()
            .map(|(p, models)| (*p, models.iter().map(|m| m.to_string()).collect()))
            .collect()
    }

    fn small_selector() -> FallbackSelector {
        FallbackSelector::new(
            vec![
                ProviderProfile::new(ProviderId::Groq, RateLimits::new(2, 1_000), &["g1", "g2"]),
                ProviderProfile::new(ProviderId::Cerebras, RateLimits::new(10, 1_000), &["c1"]),
            ],
            vec![ProviderId::Groq, ProviderId::Cerebras],
        )
    }

    #[test]
    fn test_next_model_in_list_order() {
        let selector = small_selector();
        let none = BTreeSet::new();

        assert_eq!(selector.next_model(ProviderId::Groq, "g1", &none), Some("g2".to_string()));
        assert_eq!(selector.next_model(ProviderId::Groq, "other", &none), Some("g1".to_string()));

        let all: BTreeSet<String> = ["g1", "g2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(selector.next_model(ProviderId::Groq, "g1", &all), None);
    }

    #[test]
    fn test_exhausts_current_provider_first() {
        let selector = small_selector();
        let next = selector.next_provider_and_model(ProviderId::Groq, "g1", &tried(&[(ProviderId::Groq, &["g1"])]));
        assert_eq!(next, Some((ProviderId::Groq, "g2".to_string())));
    }

    #[test]
    fn test_advances_to_next_provider_in_order() {
        let selector = small_selector();
        let next =
            selector.next_provider_and_model(ProviderId::Groq, "g2", &tried(&[(ProviderId::Groq, &["g1", "g2"])]));
        assert_eq!(next, Some((ProviderId::Cerebras, "c1".to_string())));
    }

    #[test]
    fn test_none_when_everything_tried() {
        let selector = small_selector();
        let next = selector.next_provider_and_model(
            ProviderId::Cerebras,
            "c1",
            &tried(&[(ProviderId::Groq, &["g1", "g2"]), (ProviderId::Cerebras, &["c1"])]),
        );
        assert_eq!(next, None);
    }

    #[test]
    fn test_skips_exhausted_providers_in_order() {
        let selector = FallbackSelector::default();
        let mut tried_models = TriedModels::new();
        for provider in [ProviderId::Cerebras, ProviderId::Mistral] {
            let profile = selector.profile(provider).unwrap();
            tried_models.insert(provider, profile.models.iter().cloned().collect());
        }

        let next = selector.next_provider_and_model(ProviderId::Cerebras, "llama3.1-8b", &tried_models);
        assert_eq!(next, Some((ProviderId::Google, "gemini-2.5-pro".to_string())));
    }

    #[test]
    fn test_rate_limits_lookup() {
        let selector = FallbackSelector::default();
        assert_eq!(selector.rate_limits(ProviderId::Groq), RateLimits::new(25, 5_500));
        assert_eq!(selector.rate_limits(ProviderId::Google).requests_per_minute, 2);
        assert_eq!(small_selector().rate_limits(ProviderId::Groq).requests_per_minute, 2);
    }

    #[test]
    fn test_every_provider_has_a_default_model() {
        let selector = FallbackSelector::default();
        for provider in ProviderId::ALL {
            assert!(selector.default_model(provider).is_some(), "{provider}");
        }
    }

    #[test]
    fn test_duplicate_order_entries_are_dropped() {
        let selector = FallbackSelector::new(Vec::new(), vec![ProviderId::Groq, ProviderId::Groq, ProviderId::Ollama]);
        assert_eq!(selector.provider_order(), &[ProviderId::Groq, ProviderId::Ollama]);
    }
}
