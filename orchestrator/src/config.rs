//! Orchestrator configuration
//!
//! Defaults cover normal operation; `from_env` layers `BATCH_*` variables and
//! per-provider overrides on top of them.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use shared::{ProviderId, ProviderProfile};

use crate::core::{default_profile, CircuitBreakerConfig, FallbackSelector, DEFAULT_PROVIDER_ORDER};
use crate::error::{OrchestratorError, OrchestratorResult};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Consecutive failures at one target before switching
    pub failure_threshold: u32,
    pub circuit: CircuitBreakerConfig,
    /// Attempts per work item per pass
    pub max_sample_retries: u32,
    /// Flush samples every N successes
    pub checkpoint_interval: u32,
    pub max_batch_timeout: Duration,
    /// `maxIterations = samples needed × retry_multiplier`
    pub retry_multiplier: u32,
    pub generation_timeout: Duration,
    pub retry_delay: Duration,
    pub final_flush_attempts: u32,
    pub provider_order: Vec<ProviderId>,
    pub profiles: HashMap<ProviderId, ProviderProfile>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            circuit: CircuitBreakerConfig::default(),
            max_sample_retries: 3,
            checkpoint_interval: 10,
            max_batch_timeout: Duration::from_secs(7200),
            retry_multiplier: 3,
            generation_timeout: Duration::from_secs(120),
            retry_delay: Duration::from_secs(2),
            final_flush_attempts: 3,
            provider_order: DEFAULT_PROVIDER_ORDER.to_vec(),
            profiles: ProviderId::ALL.iter().map(|p| (*p, default_profile(*p))).collect(),
        }
    }
}

impl OrchestratorConfig {
    /// Load from process environment (after `.env`, if present)
    pub fn from_env() -> OrchestratorResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> OrchestratorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var::<u32, _>(&lookup, "BATCH_FAILURE_THRESHOLD")? {
            config.failure_threshold = v;
            config.circuit.failure_threshold = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "BATCH_CIRCUIT_COOLDOWN_SECS")? {
            config.circuit.cooldown = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "BATCH_MAX_SAMPLE_RETRIES")? {
            config.max_sample_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "BATCH_CHECKPOINT_INTERVAL")? {
            config.checkpoint_interval = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "BATCH_MAX_TIMEOUT_SECS")? {
            config.max_batch_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "BATCH_RETRY_MULTIPLIER")? {
            config.retry_multiplier = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "BATCH_GENERATION_TIMEOUT_SECS")? {
            config.generation_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "BATCH_RETRY_DELAY_MS")? {
            config.retry_delay = Duration::from_millis(v);
        }

        if let Some(order) = lookup("PROVIDER_ORDER") {
            config.provider_order = parse_provider_order(&order)?;
        }

        for provider in ProviderId::ALL {
            let prefix = provider.env_prefix();
            let profile = config.profiles.entry(provider).or_insert_with(|| default_profile(provider));

            if let Some(rpm) = parse_var(&lookup, &format!("{prefix}_RPM"))? {
                profile.limits.requests_per_minute = rpm;
            }
            if let Some(tpm) = parse_var(&lookup, &format!("{prefix}_TPM"))? {
                profile.limits.tokens_per_minute = tpm;
            }
            if let Some(models) = lookup(&format!("{prefix}_MODELS")) {
                let models: Vec<String> = split_list(&models).map(str::to_string).collect();
                if models.is_empty() {
                    return Err(OrchestratorError::config(&format!("{prefix}_MODELS"), ""));
                }
                profile.models = models;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.failure_threshold == 0 {
            return Err(OrchestratorError::config("failure_threshold", "0"));
        }
        if self.circuit.failure_threshold == 0 {
            return Err(OrchestratorError::config("circuit.failure_threshold", "0"));
        }
        if self.max_sample_retries == 0 {
            return Err(OrchestratorError::config("max_sample_retries", "0"));
        }
        if self.checkpoint_interval == 0 {
            return Err(OrchestratorError::config("checkpoint_interval", "0"));
        }
        if self.retry_multiplier == 0 {
            return Err(OrchestratorError::config("retry_multiplier", "0"));
        }
        if self.provider_order.is_empty() {
            return Err(OrchestratorError::config("provider_order", ""));
        }
        Ok(())
    }

    /// Fallback selector over this configuration's profiles and order
    pub fn selector(&self) -> FallbackSelector {
        FallbackSelector::new(self.profiles.values().cloned().collect(), self.provider_order.clone())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_provider_order(value: &str) -> OrchestratorResult<Vec<ProviderId>> {
    split_list(value)
        .map(|name| ProviderId::from_str(name).map_err(|_| OrchestratorError::config("PROVIDER_ORDER", value)))
        .collect()
}

fn parse_var<T, F>(lookup: &F, key: &str) -> OrchestratorResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| OrchestratorError::config(key, raw)),
        None => Ok(None),
    }
}
