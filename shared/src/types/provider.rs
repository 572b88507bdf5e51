//! Provider identity and throughput limits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Remote text-generation providers known to the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Groq,
    Cerebras,
    Ollama,
    Google,
    Mistral,
}

impl ProviderId {
    /// Every provider, in declaration order
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Groq,
        ProviderId::Cerebras,
        ProviderId::Ollama,
        ProviderId::Google,
        ProviderId::Mistral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Groq => "groq",
            ProviderId::Cerebras => "cerebras",
            ProviderId::Ollama => "ollama",
            ProviderId::Google => "google",
            ProviderId::Mistral => "mistral",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderId::Groq => "GROQ_API_KEY",
            ProviderId::Cerebras => "CEREBRAS_API_KEY",
            ProviderId::Ollama => "OLLAMA_API_KEY",
            ProviderId::Google => "GOOGLE_API_KEY",
            ProviderId::Mistral => "MISTRAL_API_KEY",
        }
    }

    /// Prefix used for per-provider environment overrides (e.g. `GROQ_RPM`)
    pub fn env_prefix(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderId::Groq),
            "cerebras" => Ok(ProviderId::Cerebras),
            "ollama" => Ok(ProviderId::Ollama),
            "google" | "gemini" => Ok(ProviderId::Google),
            "mistral" => Ok(ProviderId::Mistral),
            other => Err(SharedError::UnknownProvider {
                name: other.to_string(),
            }),
        }
    }
}

/// Per-minute throughput allowance for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u64,
}

impl RateLimits {
    pub fn new(requests_per_minute: u32, tokens_per_minute: u64) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute,
        }
    }
}

/// Static description of one provider: its limits and ordered fallback models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: ProviderId,
    pub limits: RateLimits,
    pub models: Vec<String>,
}

impl ProviderProfile {
    pub fn new(provider: ProviderId, limits: RateLimits, models: &[&str]) -> Self {
        Self {
            provider,
            limits,
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// First model in the fallback list
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}
