//! Worker-backed gateway.
//!
//! A single background task owns the [`CompletionBackend`] and serves jobs
//! one at a time from an `mpsc` queue, each carrying a `oneshot` reply:
//!
//! ```text
//! caller ──Job──▶ [mpsc] ──▶ worker task ──▶ backend
//!   ▲                              │
//!   └────────── oneshot reply ◀────┘
//! ```
//!
//! Every call is wrapped in `tokio::time::timeout`, queueing included. If
//! the worker dies (backend panic, runtime shutdown) every pending reply
//! sender is dropped, so in-flight callers get [`LlmError::WorkerGone`]
//! instead of hanging, and the gateway reports not-ready from then on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::gateway::{CompletionBackend, TextGenerator};

/// Jobs waiting for the worker.
const QUEUE_DEPTH: usize = 32;

enum Job {
    Load {
        model: Option<String>,
        reply: oneshot::Sender<Result<(), LlmError>>,
    },
    Generate {
        prompt: String,
        max_tokens: u32,
        reply: oneshot::Sender<Result<String, LlmError>>,
    },
}

/// Gateway that forwards requests to a background worker task.
pub struct WorkerGateway {
    jobs: mpsc::Sender<Job>,
    ready: Arc<AtomicBool>,
    timeout: Duration,
}

impl std::fmt::Debug for WorkerGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerGateway")
            .field("ready", &self.is_ready())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Clears the ready flag when the worker task ends, panics included.
struct ReadyGuard(Arc<AtomicBool>);

impl Drop for ReadyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl WorkerGateway {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The gateway starts not-ready; call
    /// [`initialize`](TextGenerator::initialize) to load a model.
    #[must_use]
    pub fn spawn<B>(backend: B, timeout: Duration) -> Self
    where
        B: CompletionBackend + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let ready = Arc::new(AtomicBool::new(false));
        tokio::spawn(run_worker(backend, rx, Arc::clone(&ready)));
        Self {
            jobs: tx,
            ready,
            timeout,
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn submit<T>(
        &self,
        job: Job,
        reply: oneshot::Receiver<Result<T, LlmError>>,
    ) -> Result<T, LlmError> {
        let exchange = async {
            self.jobs.send(job).await.map_err(|_| LlmError::WorkerGone)?;
            reply.await.map_err(|_| LlmError::WorkerGone)?
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout_ms())),
        }
    }
}

async fn run_worker<B: CompletionBackend>(
    backend: B,
    mut jobs: mpsc::Receiver<Job>,
    ready: Arc<AtomicBool>,
) {
    let _guard = ReadyGuard(Arc::clone(&ready));
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Load { model, reply } => {
                let result = backend.load(model.as_deref()).await;
                ready.store(result.is_ok(), Ordering::SeqCst);
                match &result {
                    Ok(()) => info!(model = model.as_deref().unwrap_or("default"), "text generation ready"),
                    Err(e) => warn!(error = %e, "text generation failed to initialize"),
                }
                let _ = reply.send(result);
            }
            Job::Generate {
                prompt,
                max_tokens,
                reply,
            } => {
                if reply.is_closed() {
                    // Caller already timed out.
                    continue;
                }
                let result = backend.complete(&prompt, max_tokens).await;
                let _ = reply.send(result);
            }
        }
    }
    debug!("generation worker stopped");
}

#[async_trait]
impl TextGenerator for WorkerGateway {
    async fn initialize(&self, model: Option<&str>) -> Result<(), LlmError> {
        let (tx, rx) = oneshot::channel();
        let job = Job::Load {
            model: model.map(str::to_string),
            reply: tx,
        };
        let result = self.submit(job, rx).await;
        if result.is_err() {
            self.ready.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        if !self.is_ready() {
            return Err(LlmError::NotReady);
        }
        let (tx, rx) = oneshot::channel();
        let job = Job::Generate {
            prompt: prompt.to_string(),
            max_tokens,
            reply: tx,
        };
        self.submit(job, rx).await
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
