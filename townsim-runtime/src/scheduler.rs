//! Deferred conversation turns.
//!
//! Each turn is an independent tokio task registered under its
//! conversation id. Ending a conversation aborts whatever is still pending
//! for it; a task that slips through re-checks liveness before touching
//! the world.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use townsim_core::ConversationId;
use tracing::debug;

/// Registry of pending turn tasks, keyed by conversation.
#[derive(Debug, Default)]
pub struct TurnScheduler {
    tasks: Mutex<HashMap<ConversationId, HashMap<u64, AbortHandle>>>,
    next_token: AtomicU64,
}

impl TurnScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawn `turn` as a task belonging to `conversation`.
    pub fn schedule<F>(self: &Arc<Self>, conversation: ConversationId, turn: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let this = Arc::clone(self);
        // Registration happens under the lock, so the task cannot finish
        // and deregister before it is registered.
        let mut tasks = self.tasks.lock();
        let handle = tokio::spawn(async move {
            turn.await;
            this.finish(conversation, token);
        });
        tasks
            .entry(conversation)
            .or_default()
            .insert(token, handle.abort_handle());
    }

    fn finish(&self, conversation: ConversationId, token: u64) {
        let mut tasks = self.tasks.lock();
        if let Some(pending) = tasks.get_mut(&conversation) {
            pending.remove(&token);
            if pending.is_empty() {
                tasks.remove(&conversation);
            }
        }
    }

    /// Abort every pending turn of `conversation`.
    pub fn cancel(&self, conversation: ConversationId) -> usize {
        let Some(pending) = self.tasks.lock().remove(&conversation) else {
            return 0;
        };
        for handle in pending.values() {
            handle.abort();
        }
        if !pending.is_empty() {
            debug!(conversation = %conversation, cancelled = pending.len(), "pending turns cancelled");
        }
        pending.len()
    }

    /// Abort every pending turn.
    pub fn cancel_all(&self) -> usize {
        let all: Vec<_> = self.tasks.lock().drain().collect();
        let mut count = 0;
        for (_, pending) in all {
            for handle in pending.values() {
                handle.abort();
                count += 1;
            }
        }
        count
    }

    /// Turns still pending for `conversation`.
    #[must_use]
    pub fn pending(&self, conversation: ConversationId) -> usize {
        self.tasks.lock().get(&conversation).map_or(0, HashMap::len)
    }

    /// Turns pending across all conversations.
    #[must_use]
    pub fn total_pending(&self) -> usize {
        self.tasks.lock().values().map(HashMap::len).sum()
    }
}
