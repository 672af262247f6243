//! # townsim-llm — Text Generation Gateway for townsim
//!
//! The simulation asks for a line of dialogue through [`TextGenerator`] and
//! never waits on it unbounded. Backends:
//!   - **Ollama** (local, recommended default)
//!   - **OpenAI-compatible API** (llama.cpp server, vLLM, hosted APIs)
//!   - **None** — always unavailable, every turn uses canned dialogue
//!
//! # Architecture
//!
//! ```text
//! simulation ──▶ TextGenerator
//!                  ├─ UnavailableGateway            (never ready)
//!                  └─ WorkerGateway ──mpsc──▶ worker task ──▶ LlmClient ──HTTP──▶ backend
//!                       (per-call timeout)         (owns the backend)
//! ```

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

pub mod client;
pub mod error;
pub mod gateway;
pub mod prompt;
pub mod types;
pub mod worker;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use gateway::{CompletionBackend, TextGenerator, UnavailableGateway};
pub use prompt::{PromptKind, PromptSet, PromptVars};
pub use types::{GatewayConfig, LlmRequest, LlmResponse};
pub use worker::WorkerGateway;

/// Build the gateway described by `config`.
///
/// Provider `"none"` yields an [`UnavailableGateway`]; any HTTP provider
/// yields a [`WorkerGateway`] spawned on the current tokio runtime, not
/// yet initialized.
///
/// # Errors
///
/// Returns [`LlmError::ConfigError`] for an unknown provider.
pub fn gateway_from_config(config: &GatewayConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let provider = LlmProvider::from_config(config)?;
    if provider == LlmProvider::None {
        return Ok(Arc::new(UnavailableGateway));
    }
    let client = LlmClient::from_config(config)?;
    let timeout = Duration::from_millis(config.request_timeout_ms);
    Ok(Arc::new(WorkerGateway::spawn(client, timeout)))
}
