//! HTTP client for the supported text-generation providers

use std::collections::HashMap;
use std::time::Instant;
use async_trait::async_trait;
use serde_json::Value;

use shared::{process_debug, ProcessId, ProviderId};
use crate::error::{ProducerError, ProducerResult};
use crate::traits::ApiClient;
use crate::types::{CompletionSettings, ProviderResponse};

/// Longest slice of an error body carried into failure messages
const MAX_ERROR_BODY: usize = 300;

fn default_base_url(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Groq => "https://api.groq.com/openai/v1",
        ProviderId::Cerebras => "https://api.cerebras.ai/v1",
        ProviderId::Mistral => "https://api.mistral.ai/v1",
        ProviderId::Ollama => "https://ollama.com/api",
        ProviderId::Google => "https://generativelanguage.googleapis.com/v1beta",
    }
}

/// Real provider client with per-provider API keys and base URLs
pub struct RealApiClient {
    client: reqwest::Client,
    api_keys: HashMap<ProviderId, String>,
    base_urls: HashMap<ProviderId, String>,
}

impl RealApiClient {
    /// Client with default endpoints and no credentials
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_keys: HashMap::new(),
            base_urls: ProviderId::ALL
                .iter()
                .map(|provider| (*provider, default_base_url(*provider).to_string()))
                .collect(),
        }
    }

    /// Load keys from `<PROVIDER>_API_KEY` and endpoint overrides from `<PROVIDER>_BASE_URL`
    pub fn from_env() -> Self {
        let mut client = Self::new();
        for provider in ProviderId::ALL {
            if let Ok(key) = std::env::var(provider.api_key_var()) {
                if !key.trim().is_empty() {
                    client = client.with_api_key(provider, key.trim());
                }
            }
            if let Ok(url) = std::env::var(format!("{}_BASE_URL", provider.env_prefix())) {
                client = client.with_base_url(provider, &url);
            }
        }
        process_debug!(ProcessId::current(), "🔑 Loaded API keys for {} providers", client.api_keys.len());
        client
    }

    pub fn with_api_key(mut self, provider: ProviderId, key: &str) -> Self {
        self.api_keys.insert(provider, key.to_string());
        self
    }

    pub fn with_base_url(mut self, provider: ProviderId, url: &str) -> Self {
        self.base_urls.insert(provider, url.trim_end_matches('/').to_string());
        self
    }

    pub fn has_api_key(&self, provider: ProviderId) -> bool {
        self.api_keys.contains_key(&provider)
    }

    fn api_key(&self, provider: ProviderId) -> ProducerResult<&str> {
        self.api_keys
            .get(&provider)
            .map(String::as_str)
            .ok_or_else(|| ProducerError::MissingApiKey {
                provider,
                variable: provider.api_key_var().to_string(),
            })
    }

    fn base_url(&self, provider: ProviderId) -> &str {
        self.base_urls
            .get(&provider)
            .map(String::as_str)
            .unwrap_or_else(|| default_base_url(provider))
    }

    /// POST a JSON body and return the parsed JSON reply, mapping failures to provider errors
    async fn post_json(
        &self,
        provider: ProviderId,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> ProducerResult<Value> {
        let mut request = self.client.post(url).header("Content-Type", "application/json").json(body);
        if let Some(key) = bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProducerError::RequestTimeout {
                    provider,
                    message: e.to_string(),
                }
            } else {
                ProducerError::Connection {
                    provider,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProducerError::HttpStatus {
                provider,
                status: status.to_string(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        response.json().await.map_err(|e| ProducerError::ResponseFormat {
            provider,
            message: format!("Failed to parse response: {}", e),
        })
    }

    /// Groq, Cerebras and Mistral: OpenAI-compatible chat completions
    async fn openai_compatible(
        &self,
        provider: ProviderId,
        model: &str,
        prompt: &str,
        settings: CompletionSettings,
    ) -> ProducerResult<(String, u64)> {
        let api_key = self.api_key(provider)?;
        let request_body = serde_json::json!({
            "model": model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": settings.max_tokens,
            "temperature": settings.temperature,
            "top_p": settings.top_p
        });

        let url = format!("{}/chat/completions", self.base_url(provider));
        let response_json = self.post_json(provider, &url, Some(api_key), &request_body).await?;

        let content = response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| ProducerError::ResponseFormat {
                provider,
                message: "No content in response".to_string(),
            })?;

        let tokens = response_json
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);

        Ok((content.to_string(), tokens))
    }

    /// Ollama native chat API
    async fn ollama(&self, model: &str, prompt: &str) -> ProducerResult<(String, u64)> {
        let provider = ProviderId::Ollama;
        let api_key = self.api_key(provider)?;
        let request_body = serde_json::json!({
            "model": model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "stream": false
        });

        let url = format!("{}/chat", self.base_url(provider));
        let response_json = self.post_json(provider, &url, Some(api_key), &request_body).await?;

        let content = response_json
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| ProducerError::ResponseFormat {
                provider,
                message: "missing key 'message.content'".to_string(),
            })?;

        let prompt_tokens = response_json.get("prompt_eval_count").and_then(|t| t.as_u64()).unwrap_or(0);
        let completion_tokens = response_json.get("eval_count").and_then(|t| t.as_u64()).unwrap_or(0);

        Ok((content.trim().to_string(), prompt_tokens + completion_tokens))
    }

    /// Google AI Studio generateContent, forced to JSON output
    async fn google(&self, model: &str, prompt: &str, settings: CompletionSettings) -> ProducerResult<(String, u64)> {
        let provider = ProviderId::Google;
        let api_key = self.api_key(provider)?;
        let request_body = serde_json::json!({
            "contents": [
                {
                    "parts": [
                        {
                            "text": prompt
                        }
                    ]
                }
            ],
            "generationConfig": {
                "maxOutputTokens": settings.max_tokens,
                "temperature": settings.temperature,
                "topP": settings.top_p,
                "responseMimeType": "application/json"
            }
        });

        let url = format!("{}/models/{}:generateContent?key={}", self.base_url(provider), model, api_key);
        let response_json = self.post_json(provider, &url, None, &request_body).await?;

        let content = response_json
            .get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| ProducerError::ResponseFormat {
                provider,
                message: "No response candidates".to_string(),
            })?;

        let tokens = response_json
            .get("usageMetadata")
            .and_then(|u| u.get("totalTokenCount"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);

        Ok((content.to_string(), tokens))
    }
}

impl Default for RealApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiClient for RealApiClient {
    async fn complete(
        &self,
        provider: ProviderId,
        model: &str,
        prompt: &str,
        settings: CompletionSettings,
    ) -> ProducerResult<ProviderResponse> {
        let request_start = Instant::now();

        let (content, tokens_used) = match provider {
            ProviderId::Groq | ProviderId::Cerebras | ProviderId::Mistral => {
                self.openai_compatible(provider, model, prompt, settings).await?
            }
            ProviderId::Ollama => self.ollama(model, prompt).await?,
            ProviderId::Google => self.google(model, prompt, settings).await?,
        };

        Ok(ProviderResponse {
            content,
            tokens_used,
            response_time: request_start.elapsed(),
        })
    }
}
