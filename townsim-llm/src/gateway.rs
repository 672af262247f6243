//! The text generation boundary.
//!
//! The simulation only ever talks to a [`TextGenerator`]. Two
//! implementations ship with the crate:
//!
//! - [`UnavailableGateway`] — never ready; every turn uses canned lines
//! - [`WorkerGateway`](crate::worker::WorkerGateway) — a background task
//!   driving a [`CompletionBackend`], with a hard per-call timeout

use async_trait::async_trait;

use crate::error::LlmError;

/// Abstract "generate text from a prompt" capability.
///
/// Calling [`generate_text`](Self::generate_text) before a successful
/// [`initialize`](Self::initialize) is allowed and fails with
/// [`LlmError::NotReady`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Load `model` (or the configured default) and become ready.
    async fn initialize(&self, model: Option<&str>) -> Result<(), LlmError>;

    /// Generate at most `max_tokens` tokens continuing `prompt`.
    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;

    /// Whether generation can currently be attempted.
    fn is_ready(&self) -> bool;
}

/// Something that actually produces completions, owned by a worker.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Prepare `model` for use.
    async fn load(&self, model: Option<&str>) -> Result<(), LlmError>;

    /// Produce a completion.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// A gateway with no model behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGateway;

#[async_trait]
impl TextGenerator for UnavailableGateway {
    async fn initialize(&self, _model: Option<&str>) -> Result<(), LlmError> {
        Err(LlmError::Unavailable("no text generation backend configured".into()))
    }

    async fn generate_text(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        Err(LlmError::NotReady)
    }

    fn is_ready(&self) -> bool {
        false
    }
}
