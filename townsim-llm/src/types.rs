//! Core types for generation requests, responses and gateway setup.

use serde::{Deserialize, Serialize};

/// A request to a completion backend.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// Full prompt text.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Per-attempt HTTP timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// A short dialogue request with the default sampling settings.
    #[must_use]
    pub fn dialogue(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.8,
            timeout_ms: 20_000,
        }
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from a completion backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

/// Everything needed to build a gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// `"none"`, `"ollama"` or `"openai"`.
    pub provider: String,
    /// Backend base URL.
    pub base_url: String,
    /// Bearer token for OpenAI-compatible APIs.
    pub api_key: Option<String>,
    /// Model to load on initialization.
    pub model: String,
    /// Hard cap on one generation call, queueing included.
    pub request_timeout_ms: u64,
    /// Extra HTTP attempts after the first.
    pub max_retries: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:0.5b".into(),
            request_timeout_ms: 20_000,
            max_retries: 1,
            temperature: 0.8,
        }
    }
}
