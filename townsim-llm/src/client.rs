//! LLM Client: HTTP completion backend for Ollama and OpenAI-compatible APIs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::gateway::CompletionBackend;
use crate::types::{GatewayConfig, LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmProvider {
    /// Ollama running locally (recommended).
    Ollama {
        /// e.g. `http://localhost:11434`
        base_url: String,
    },
    /// OpenAI-compatible API (llama.cpp server, vLLM, hosted APIs).
    OpenAiCompatible {
        /// API root without the `/v1` suffix.
        base_url: String,
        /// Bearer token, may be empty for local servers.
        api_key: String,
    },
    /// No LLM available; every call fails and the caller falls back to canned lines.
    None,
}

impl LlmProvider {
    /// Build a provider from its configured name.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        match config.provider.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama { base_url }),
            "openai" | "openai_compatible" => Ok(Self::OpenAiCompatible {
                base_url,
                api_key: config.api_key.clone().unwrap_or_default(),
            }),
            other => Err(LlmError::ConfigError(format!("unknown provider '{other}'"))),
        }
    }
}

/// The HTTP client that routes requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: RwLock<String>,
    max_retries: u32,
    temperature: f32,
    timeout_ms: u64,
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: RwLock::new(model.into()),
            max_retries,
            temperature: 0.8,
            timeout_ms: 20_000,
        }
    }

    /// Create a client from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, LlmError> {
        let mut client = Self::new(
            LlmProvider::from_config(config)?,
            config.model.clone(),
            config.max_retries,
        );
        client.temperature = config.temperature;
        client.timeout_ms = config.request_timeout_ms;
        Ok(client)
    }

    /// Create a client with no LLM backend (all calls fail → canned fallback).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Model used for the next request.
    #[must_use]
    pub fn model(&self) -> String {
        self.model.read().clone()
    }

    /// Switch models.
    pub fn set_model(&self, model: impl Into<String>) {
        *self.model.write() = model.into();
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Generate a completion.
    ///
    /// Returns `Err` if the LLM is unavailable or all retries fail.
    /// The caller should fall back to canned dialogue on error.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.generate_openai(base_url, api_key, request).await
            }
        }
    }

    /// Check that the backend answers and knows the configured model.
    pub async fn probe(&self) -> Result<(), LlmError> {
        let model = self.model();
        let (url, key) = match &self.provider {
            LlmProvider::None => {
                return Err(LlmError::Unavailable("No LLM provider configured".into()));
            }
            LlmProvider::Ollama { base_url } => (format!("{base_url}/api/tags"), None),
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                (format!("{base_url}/v1/models"), Some(api_key.as_str()))
            }
        };

        let mut req = self.http.get(&url).timeout(Duration::from_millis(self.timeout_ms));
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(LlmError::Unavailable(format!("HTTP {}", resp.status())));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        if model_listed(&body, &model) {
            info!(%model, "LLM backend ready");
            Ok(())
        } else {
            Err(LlmError::Unavailable(format!("model '{model}' not available")))
        }
    }

    /// Generate using Ollama's API.
    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.model();
        let url = format!("{base_url}/api/generate");
        let body = json!({
            "model": model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        let json = self.post_with_retries("Ollama", &url, None, &body, request.timeout_ms).await?;
        Ok(LlmResponse {
            text: json.body["response"].as_str().unwrap_or_default().to_string(),
            tokens_generated: json.body["eval_count"].as_u64().unwrap_or(0) as u32,
            latency_ms: json.latency_ms,
            model,
        })
    }

    /// Generate using an OpenAI-compatible API.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.model();
        let url = format!("{base_url}/v1/chat/completions");
        let body = json!({
            "model": model,
            "messages": [
                { "role": "user", "content": request.prompt },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let key = Some(api_key).filter(|k| !k.is_empty());
        let json = self.post_with_retries("OpenAI API", &url, key, &body, request.timeout_ms).await?;
        Ok(LlmResponse {
            text: json.body["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            tokens_generated: json.body["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
            latency_ms: json.latency_ms,
            model,
        })
    }

    async fn post_with_retries(
        &self,
        backend: &str,
        url: &str,
        api_key: Option<&str>,
        body: &serde_json::Value,
        timeout_ms: u64,
    ) -> Result<JsonReply, LlmError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!("Retrying {backend} call (attempt {}/{})", attempt + 1, self.max_retries + 1);
            }

            let start = Instant::now();
            let mut req = self
                .http
                .post(url)
                .json(body)
                .timeout(Duration::from_millis(timeout_ms));
            if let Some(key) = api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }

            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    return Ok(JsonReply {
                        body,
                        latency_ms: start.elapsed().as_millis() as u64,
                    });
                }
                Ok(resp) => {
                    last_error = format!("HTTP {}: {}", resp.status(), resp.text().await.unwrap_or_default());
                    warn!("{backend} returned error: {last_error}");
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!("{backend} request timed out after {timeout_ms}ms");
                    } else {
                        warn!("{backend} request failed: {last_error}");
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

struct JsonReply {
    body: serde_json::Value,
    latency_ms: u64,
}

/// Whether a model listing (`/api/tags` or `/v1/models`) contains `model`.
///
/// Ollama lists `name: "qwen2.5:0.5b"`; OpenAI-style servers list
/// `id: "..."`. A bare name also matches its `:latest` tag.
fn model_listed(body: &serde_json::Value, model: &str) -> bool {
    let entries = body["models"]
        .as_array()
        .or_else(|| body["data"].as_array());
    let Some(entries) = entries else {
        return false;
    };
    let latest = format!("{model}:latest");
    entries.iter().any(|e| {
        ["name", "id", "model"]
            .iter()
            .filter_map(|k| e[*k].as_str())
            .any(|n| n == model || n == latest)
    })
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn load(&self, model: Option<&str>) -> Result<(), LlmError> {
        if let Some(model) = model {
            self.set_model(model);
        }
        self.probe().await
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request = LlmRequest::dialogue(prompt, max_tokens)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout_ms);
        self.generate(&request).await.map(|r| r.text)
    }
}
