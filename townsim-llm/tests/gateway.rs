//! Worker gateway behavior under a paused tokio clock.
//!
//! Backends here are in-process doubles: one that answers, one that hangs,
//! one that fails to load and one that panics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use townsim_llm::{
    CompletionBackend, GatewayConfig, LlmError, TextGenerator, WorkerGateway, gateway_from_config,
};

const TIMEOUT: Duration = Duration::from_secs(20);

/// Echoes the prompt length and counts calls.
#[derive(Default)]
struct EchoBackend {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl CompletionBackend for EchoBackend {
    async fn load(&self, _model: Option<&str>) -> Result<(), LlmError> {
        Ok(())
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} chars, {max_tokens} tokens", prompt.len()))
    }
}

/// Loads fine, then never answers in time.
struct HangingBackend;

#[async_trait]
impl CompletionBackend for HangingBackend {
    async fn load(&self, _model: Option<&str>) -> Result<(), LlmError> {
        Ok(())
    }

    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".into())
    }
}

/// The model is missing.
struct MissingModelBackend;

#[async_trait]
impl CompletionBackend for MissingModelBackend {
    async fn load(&self, model: Option<&str>) -> Result<(), LlmError> {
        Err(LlmError::Unavailable(format!("model '{}' not available", model.unwrap_or("default"))))
    }

    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        unreachable!("never ready")
    }
}

/// Crashes the worker on the first generation.
struct CrashingBackend;

#[async_trait]
impl CompletionBackend for CrashingBackend {
    async fn load(&self, _model: Option<&str>) -> Result<(), LlmError> {
        Ok(())
    }

    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        panic!("backend crashed");
    }
}

#[tokio::test(start_paused = true)]
async fn generation_before_initialize_is_not_ready() {
    let gw = WorkerGateway::spawn(EchoBackend::default(), TIMEOUT);
    assert!(!gw.is_ready());
    assert!(matches!(gw.generate_text("hi", 10).await, Err(LlmError::NotReady)));
}

#[tokio::test(start_paused = true)]
async fn initialized_gateway_generates() {
    let backend = EchoBackend::default();
    let calls = Arc::clone(&backend.calls);
    let gw = WorkerGateway::spawn(backend, TIMEOUT);

    gw.initialize(Some("tiny")).await.expect("initialize");
    assert!(gw.is_ready());
    let text = gw.generate_text("hello", 30).await.expect("generate");
    assert_eq!(text, "5 chars, 30 tokens");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_generation_times_out() {
    let gw = WorkerGateway::spawn(HangingBackend, TIMEOUT);
    gw.initialize(None).await.expect("initialize");

    let start = tokio::time::Instant::now();
    let err = gw.generate_text("hello", 30).await.expect_err("must time out");
    assert!(matches!(err, LlmError::Timeout(20_000)), "{err:?}");
    assert!(start.elapsed() >= TIMEOUT);
    assert!(start.elapsed() < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn failed_initialize_stays_not_ready() {
    let gw = WorkerGateway::spawn(MissingModelBackend, TIMEOUT);
    assert!(matches!(gw.initialize(Some("huge")).await, Err(LlmError::Unavailable(_))));
    assert!(!gw.is_ready());
    assert!(matches!(gw.generate_text("hi", 5).await, Err(LlmError::NotReady)));
}

#[tokio::test(start_paused = true)]
async fn crashed_worker_rejects_instead_of_hanging() {
    let gw = WorkerGateway::spawn(CrashingBackend, TIMEOUT);
    gw.initialize(None).await.expect("initialize");

    let err = gw.generate_text("boom", 5).await.expect_err("worker crashed");
    assert!(matches!(err, LlmError::WorkerGone), "{err:?}");
    assert!(!gw.is_ready());
    assert!(gw.generate_text("again", 5).await.is_err());
}

#[tokio::test]
async fn config_selects_gateway_kind() {
    let none = gateway_from_config(&GatewayConfig::default()).expect("none");
    assert!(!none.is_ready());
    assert!(matches!(none.generate_text("hi", 5).await, Err(LlmError::NotReady)));

    let ollama = gateway_from_config(&GatewayConfig {
        provider: "ollama".into(),
        ..GatewayConfig::default()
    })
    .expect("ollama");
    assert!(!ollama.is_ready());

    let bad = gateway_from_config(&GatewayConfig {
        provider: "carrier-pigeon".into(),
        ..GatewayConfig::default()
    });
    assert!(matches!(bad, Err(LlmError::ConfigError(_))));
}
