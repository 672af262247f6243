//! The running simulation: world lock, tick loop, turn scheduling, observer.
//!
//! [`Simulation`] is a cheap handle; clones share one world. The world
//! lock is a `parking_lot::Mutex` and is never held across an `.await`:
//! generation happens between a snapshot of the turn and the write-back of
//! its result, and the write-back re-validates that the conversation is
//! still alive.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use townsim_core::{
    AgentId, ConversationId, Phase, SimTime, SimulationWorld, TickReport, TownConfig, TownError,
    TurnFollowUp,
};
use townsim_llm::{PromptSet, TextGenerator};
use tracing::{debug, info, warn};

use crate::config;
use crate::dialogue;
use crate::scheduler::TurnScheduler;

/// Callback fired once per tick after all of the tick's mutations.
pub type UpdateObserver = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct Shared {
    pub(crate) world: Mutex<SimulationWorld>,
    pub(crate) gateway: Arc<dyn TextGenerator>,
    pub(crate) prompts: PromptSet,
    pub(crate) scheduler: Arc<TurnScheduler>,
    observer: Mutex<Option<UpdateObserver>>,
    notifying: Mutex<()>,
    tick_loop: Mutex<Option<JoinHandle<()>>>,
    origin: Instant,
}

/// Handle to a running town.
#[derive(Clone)]
pub struct Simulation {
    pub(crate) inner: Arc<Shared>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let running = self.is_running();
        f.debug_struct("Simulation")
            .field("world", &*self.inner.world.lock())
            .field("running", &running)
            .field("pending_turns", &self.inner.scheduler.total_pending())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Wrap an existing world.
    ///
    /// The simulation clock starts now.
    #[must_use]
    pub fn new(world: SimulationWorld, gateway: Arc<dyn TextGenerator>, prompts: PromptSet) -> Self {
        Self {
            inner: Arc::new(Shared {
                world: Mutex::new(world),
                gateway,
                prompts,
                scheduler: TurnScheduler::new(),
                observer: Mutex::new(None),
                notifying: Mutex::new(()),
                tick_loop: Mutex::new(None),
                origin: Instant::now(),
            }),
        }
    }

    /// Build a simulation with the default cast from a configuration.
    ///
    /// The gateway is created but not initialized; see
    /// [`Simulation::initialize_gateway`]. Must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, an unknown provider or an
    /// unreadable prompt file.
    pub fn from_config(config: TownConfig) -> anyhow::Result<Self> {
        let mut world = SimulationWorld::new(config).context("invalid town configuration")?;
        let llm = &world.config().llm;
        let gateway = townsim_llm::gateway_from_config(&config::gateway_config(llm))
            .context("failed to create text generation gateway")?;
        let prompts = config::load_prompts(llm)?;
        world.seed_default_cast();
        Ok(Self::new(world, gateway, prompts))
    }

    /// Load the configured model. Failure leaves the town on canned dialogue.
    pub async fn initialize_gateway(&self) -> bool {
        let model = self.inner.world.lock().config().llm.model.clone();
        match self.inner.gateway.initialize(Some(&model)).await {
            Ok(()) => {
                info!(model = %model, "text generation ready");
                true
            }
            Err(e) => {
                warn!(model = %model, error = %e, "text generation unavailable, using canned dialogue");
                false
            }
        }
    }

    /// Whether generated dialogue is available.
    #[must_use]
    pub fn gateway_ready(&self) -> bool {
        self.inner.gateway.is_ready()
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        let ms = u64::try_from(self.inner.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        SimTime::from_millis(ms)
    }

    /// Read the world under the lock.
    pub fn with_world<R>(&self, f: impl FnOnce(&SimulationWorld) -> R) -> R {
        f(&self.inner.world.lock())
    }

    /// Mutate the world under the lock.
    ///
    /// Conversations started or ended through this escape hatch are not
    /// scheduled; prefer the control operations.
    pub fn with_world_mut<R>(&self, f: impl FnOnce(&mut SimulationWorld) -> R) -> R {
        f(&mut self.inner.world.lock())
    }

    /// Register the observer, replacing any previous one.
    pub fn set_on_update<F>(&self, observer: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.observer.lock() = Some(Arc::new(observer));
    }

    /// Remove the observer.
    pub fn clear_on_update(&self) {
        *self.inner.observer.lock() = None;
    }

    fn notify(&self) {
        let observer = self.inner.observer.lock().clone();
        if let Some(observer) = observer {
            let _serial = self.inner.notifying.lock();
            observer();
        }
    }

    // ---- Tick loop ----

    /// Run one tick now.
    ///
    /// Conversations that expired lose their pending turns; conversations
    /// that started get their opening turn scheduled. The observer fires
    /// once at the end.
    pub fn tick(&self) -> TickReport {
        let now = self.now();
        let report = self.inner.world.lock().tick(now);
        for conv in &report.expired {
            self.inner.scheduler.cancel(*conv);
        }
        for conv in &report.started {
            self.schedule_opening(*conv);
        }
        if !report.is_quiet() {
            debug!(
                arrivals = report.arrivals.len(),
                started = report.started.len(),
                expired = report.expired.len(),
                decisions = report.decisions.len(),
                "tick"
            );
        }
        self.notify();
        report
    }

    /// Start ticking at the configured interval. No-op when running.
    pub fn start(&self) {
        let interval_ms = self.inner.world.lock().config().general.tick_interval_ms;
        let mut slot = self.inner.tick_loop.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let period = Duration::from_millis(interval_ms);
        let sim = self.clone();
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                sim.tick();
            }
        }));
        info!(interval_ms, "simulation started");
    }

    /// Stop ticking. Turns already scheduled still play out.
    pub fn stop(&self) {
        if let Some(handle) = self.inner.tick_loop.lock().take() {
            handle.abort();
            info!("simulation stopped");
        }
    }

    /// Whether the tick loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .tick_loop
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    // ---- Turns ----

    /// Turns still scheduled for `conversation`.
    #[must_use]
    pub fn pending_turns(&self, conversation: ConversationId) -> usize {
        self.inner.scheduler.pending(conversation)
    }

    pub(crate) fn schedule_opening(&self, conversation: ConversationId) {
        let initiator = self
            .inner
            .world
            .lock()
            .conversation(conversation)
            .map(|c| c.participants[0]);
        if let Some(speaker) = initiator {
            self.schedule_turn(conversation, speaker, Phase::Start, Duration::ZERO);
        }
    }

    pub(crate) fn schedule_turn(
        &self,
        conversation: ConversationId,
        speaker: AgentId,
        phase: Phase,
        delay: Duration,
    ) {
        let sim = self.clone();
        self.inner.scheduler.schedule(conversation, async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            sim.run_turn(conversation, speaker, phase).await;
        });
    }

    pub(crate) fn handle_follow_up(&self, conversation: ConversationId, follow_up: TurnFollowUp) {
        match follow_up {
            TurnFollowUp::Reply { next_speaker, delay } => {
                self.schedule_turn(conversation, next_speaker, Phase::Continue, delay);
            }
            TurnFollowUp::AwaitUser => {}
            TurnFollowUp::Ended(reason) => {
                debug!(conversation = %conversation, ?reason, "conversation finished");
                self.inner.scheduler.cancel(conversation);
            }
        }
    }

    async fn run_turn(&self, conversation: ConversationId, speaker: AgentId, phase: Phase) {
        let active = self.inner.world.lock().is_active(conversation);
        if !active {
            debug!(conversation = %conversation, speaker = %speaker, "stale turn skipped");
            return;
        }

        let text = match self.generate_conversation_message(conversation, speaker, phase).await {
            Ok(text) => text,
            Err(e) => {
                debug!(conversation = %conversation, error = %e, "turn dropped");
                return;
            }
        };

        let now = self.now();
        let recorded = self
            .inner
            .world
            .lock()
            .record_message(conversation, speaker, &text, now);
        match recorded {
            Ok(follow_up) => self.handle_follow_up(conversation, follow_up),
            Err(e) => debug!(conversation = %conversation, error = %e, "turn result discarded"),
        }
    }

    /// Produce `speaker`'s next line in `conversation`.
    ///
    /// Uses the gateway when it is ready and canned dialogue otherwise, or
    /// when generation fails or times out. The line is always cleaned and
    /// never empty. Nothing is recorded.
    ///
    /// # Errors
    ///
    /// Fails only when the conversation is gone or `speaker` is not in it.
    pub async fn generate_conversation_message(
        &self,
        conversation: ConversationId,
        speaker: AgentId,
        phase: Phase,
    ) -> Result<String, TownError> {
        let ctx = self
            .inner
            .world
            .lock()
            .turn_context(conversation, speaker, phase)?;
        let generated =
            dialogue::generate_raw(self.inner.gateway.as_ref(), &self.inner.prompts, &ctx).await;
        let raw = match generated {
            Some(text) => text,
            None => self.inner.world.lock().fallback_line(&ctx),
        };
        Ok(dialogue::finish_line(&raw, &ctx))
    }
}
