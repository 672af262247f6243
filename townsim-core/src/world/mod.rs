//! The simulation world: owned registry of agents and conversations.
//!
//! [`SimulationWorld`] is a plain value: no globals, no interior
//! mutability. The runtime wraps it in a lock; tests drive it directly with
//! an explicit clock.
//!
//! Split across files:
//! - `mod.rs` — registry, conversation lifecycle, turn bookkeeping
//! - `tick.rs` — the per-tick update and the decision engine driver
//! - `control.rs` — external control operations
//! - `status.rs` — read-only snapshots

mod control;
mod status;
mod tick;

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::archetype::{Archetype, default_cast};
use crate::config::TownConfig;
use crate::conversation::{Conversation, EndReason, Message, Phase, TurnContext};
use crate::error::{Result, TownError};
use crate::fallback::DialogueTable;
use crate::personality::{KeywordScorer, PersonalityScorer};
use crate::types::{AgentId, ConversationId, Position, SimTime};

pub use control::ForceTalk;
pub use status::{Activity, AgentStatus};
pub use tick::TickReport;

/// What has to happen after a message was recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnFollowUp {
    /// `next_speaker` should answer after `delay`.
    Reply {
        /// Who answers.
        next_speaker: AgentId,
        /// Randomized pause before the answer.
        delay: Duration,
    },
    /// The next speaker is user-controlled; nothing is scheduled.
    AwaitUser,
    /// The conversation is over.
    Ended(EndReason),
}

/// All agents and conversations of one simulation.
pub struct SimulationWorld {
    config: TownConfig,
    agents: BTreeMap<AgentId, Agent>,
    conversations: BTreeMap<ConversationId, Conversation>,
    next_agent_id: u64,
    next_conversation_id: u64,
    rng: StdRng,
    scorer: Box<dyn PersonalityScorer>,
    dialogue: DialogueTable,
}

impl std::fmt::Debug for SimulationWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationWorld")
            .field("agents", &self.agents.len())
            .field("conversations", &self.conversations.len())
            .finish_non_exhaustive()
    }
}

impl SimulationWorld {
    /// Create an empty world.
    ///
    /// The RNG is seeded from `config.general.seed` when present, so seeded
    /// worlds replay identically.
    ///
    /// # Errors
    /// Returns `TownError::Config` when `config` fails
    /// [`TownConfig::validate`].
    pub fn new(config: TownConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.general.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            agents: BTreeMap::new(),
            conversations: BTreeMap::new(),
            next_agent_id: 1,
            next_conversation_id: 1,
            rng,
            scorer: Box::new(KeywordScorer::default()),
            dialogue: DialogueTable::builtin(),
        })
    }

    /// Replace the personality scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Box<dyn PersonalityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the canned dialogue table.
    #[must_use]
    pub fn with_dialogue(mut self, dialogue: DialogueTable) -> Self {
        self.dialogue = dialogue;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TownConfig {
        &self.config
    }

    /// Swap in a new configuration, for tuning a live world.
    ///
    /// The RNG keeps its current state; a changed seed only applies to
    /// worlds built with [`SimulationWorld::new`].
    ///
    /// # Errors
    /// Returns `TownError::Config` and keeps the old configuration when
    /// `config` fails [`TownConfig::validate`].
    pub fn set_config(&mut self, config: TownConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Look up an agent.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Mutable access to an agent, for tests and scripted setups.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// All agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Number of agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Look up an active conversation.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    /// All active conversations in id order.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    /// Whether `id` is still active.
    #[must_use]
    pub fn is_active(&self, id: ConversationId) -> bool {
        self.conversations.contains_key(&id)
    }

    /// Transcript of a conversation as `(speaker name, text)` pairs.
    #[must_use]
    pub fn transcript(&self, id: ConversationId) -> Option<Vec<(String, String)>> {
        let conv = self.conversations.get(&id)?;
        Some(
            conv.messages
                .iter()
                .map(|m| (self.display_name(m.speaker), m.text.clone()))
                .collect(),
        )
    }

    fn display_name(&self, id: AgentId) -> String {
        self.agents
            .get(&id)
            .map_or_else(|| id.to_string(), |a| a.name.clone())
    }

    fn agent_ref(&self, id: AgentId) -> Result<&Agent> {
        self.agents.get(&id).ok_or(TownError::AgentNotFound(id))
    }

    fn agent_mut_ref(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.agents.get_mut(&id).ok_or(TownError::AgentNotFound(id))
    }

    // ---- Registry ----

    /// Add an NPC and return its id.
    pub fn spawn_npc(
        &mut self,
        name: &str,
        identity: &str,
        archetype: Archetype,
        position: Position,
        goals: &[&str],
    ) -> AgentId {
        let id = self.allocate_agent_id();
        let position = position.clamped(self.config.world.width, self.config.world.height);
        let mut agent = Agent::npc(id, name, identity, archetype, position);
        agent.goals = goals.iter().map(|g| (*g).to_string()).collect();
        agent.goals.truncate(self.config.memory.max_goals.max(1));
        info!(agent = %id, name, %archetype, "NPC spawned");
        self.agents.insert(id, agent);
        id
    }

    /// Spawn the five built-in townsfolk.
    pub fn seed_default_cast(&mut self) -> Vec<AgentId> {
        default_cast()
            .into_iter()
            .map(|m| {
                self.spawn_npc(
                    m.name,
                    m.identity,
                    m.archetype,
                    Position::new(m.x, m.y),
                    m.goals,
                )
            })
            .collect()
    }

    /// Remove any agent. Its conversation, if any, ends first.
    ///
    /// Returns the conversation that was ended.
    pub fn remove_agent(&mut self, id: AgentId, now: SimTime) -> Result<Option<ConversationId>> {
        let conv = self.agent_ref(id)?.current_conversation;
        if let Some(conv) = conv {
            self.end_conversation(conv, EndReason::ParticipantRemoved, now)?;
        }
        self.agents.remove(&id);
        info!(agent = %id, "agent removed");
        Ok(conv)
    }

    fn allocate_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    fn random_position(&mut self) -> Position {
        let w = self.config.world.width;
        let h = self.config.world.height;
        Position::new(self.rng.gen_range(0.0..=w), self.rng.gen_range(0.0..=h))
    }

    // ---- Conversation lifecycle ----

    /// Start a conversation with `initiator` speaking first.
    ///
    /// Both agents must exist, be distinct, and not already be in a
    /// conversation. Both stop walking. A "talk to" goal naming the partner
    /// is consumed on either side.
    pub fn start_conversation(
        &mut self,
        initiator: AgentId,
        responder: AgentId,
        now: SimTime,
    ) -> Result<ConversationId> {
        if initiator == responder {
            return Err(TownError::SelfConversation(initiator));
        }
        let a = self.agent_ref(initiator)?;
        let b = self.agent_ref(responder)?;
        if a.current_conversation.is_some() {
            return Err(TownError::AgentBusy(initiator));
        }
        if b.current_conversation.is_some() {
            return Err(TownError::AgentBusy(responder));
        }
        let a_name = a.name.clone();
        let b_name = b.name.clone();

        let id = ConversationId(self.next_conversation_id);
        self.next_conversation_id += 1;
        self.conversations
            .insert(id, Conversation::new(id, initiator, responder, now));

        for (agent_id, partner) in [(initiator, &b_name), (responder, &a_name)] {
            let agent = self.agent_mut_ref(agent_id)?;
            agent.stop();
            agent.current_conversation = Some(id);
            if agent.consume_goal(&format!("talk to {partner}")) {
                debug!(agent = %agent_id, partner = %partner, "talk goal fulfilled");
            }
        }

        info!(conversation = %id, initiator = %a_name, responder = %b_name, "conversation started");
        Ok(id)
    }

    /// End a conversation and free its participants.
    pub fn end_conversation(
        &mut self,
        id: ConversationId,
        reason: EndReason,
        now: SimTime,
    ) -> Result<Conversation> {
        let conv = self
            .conversations
            .remove(&id)
            .ok_or(TownError::ConversationNotFound(id))?;

        let cap = self.config.memory.max_memories;
        let [a, b] = conv.participants;
        let names = [self.display_name(a), self.display_name(b)];
        for (agent_id, partner) in [(a, &names[1]), (b, &names[0])] {
            if let Some(agent) = self.agents.get_mut(&agent_id) {
                if agent.current_conversation == Some(id) {
                    agent.current_conversation = None;
                }
                agent.last_conversation_end = Some(now);
                agent.remember(format!("Talked with {partner}"), cap);
            }
        }

        info!(
            conversation = %id,
            ?reason,
            messages = conv.messages.len(),
            "conversation ended"
        );
        Ok(conv)
    }

    /// Append a message spoken by `speaker` and work out what comes next.
    ///
    /// Reaching the message cap ends the conversation.
    pub fn record_message(
        &mut self,
        conversation: ConversationId,
        speaker: AgentId,
        text: &str,
        now: SimTime,
    ) -> Result<TurnFollowUp> {
        let max_messages = self.config.conversation.max_messages;
        let conv = self
            .conversations
            .get_mut(&conversation)
            .ok_or(TownError::ConversationNotFound(conversation))?;
        let Some(next_speaker) = conv.other(speaker) else {
            return Err(TownError::NotParticipant {
                agent: speaker,
                conversation,
            });
        };

        conv.messages.push(Message {
            speaker,
            text: text.to_string(),
            timestamp: now,
        });
        let full = conv.is_full(max_messages);
        let count = conv.messages.len();

        self.agent_mut_ref(speaker)?.say(text, now);
        debug!(conversation = %conversation, speaker = %speaker, count, text, "message recorded");

        if full {
            self.end_conversation(conversation, EndReason::MessageCap, now)?;
            return Ok(TurnFollowUp::Ended(EndReason::MessageCap));
        }

        if self.agent_ref(next_speaker)?.is_user_controlled {
            return Ok(TurnFollowUp::AwaitUser);
        }

        let cfg = &self.config.conversation;
        let ms = self
            .rng
            .gen_range(cfg.reply_delay_min_ms..=cfg.reply_delay_max_ms);
        Ok(TurnFollowUp::Reply {
            next_speaker,
            delay: Duration::from_millis(ms),
        })
    }

    /// Snapshot everything needed to produce `speaker`'s next line.
    pub fn turn_context(
        &self,
        conversation: ConversationId,
        speaker: AgentId,
        requested: Phase,
    ) -> Result<TurnContext> {
        let cfg = &self.config.conversation;
        let conv = self
            .conversations
            .get(&conversation)
            .ok_or(TownError::ConversationNotFound(conversation))?;
        let listener = conv.other(speaker).ok_or(TownError::NotParticipant {
            agent: speaker,
            conversation,
        })?;
        let s = self.agent_ref(speaker)?;
        let l = self.agent_ref(listener)?;

        let phase = conv.effective_phase(requested, cfg.max_messages);
        let history = if phase == Phase::Start {
            Vec::new()
        } else {
            conv.recent(cfg.history_window)
                .iter()
                .map(|m| (self.display_name(m.speaker), m.text.clone()))
                .collect()
        };

        Ok(TurnContext {
            conversation,
            speaker,
            speaker_name: s.name.clone(),
            speaker_identity: s.identity.clone(),
            archetype: s.archetype,
            listener,
            listener_name: l.name.clone(),
            phase,
            history,
            max_tokens: phase.max_tokens(cfg),
            max_chars: cfg.max_chars,
        })
    }

    /// A canned line for the turn described by `ctx`.
    pub fn fallback_line(&mut self, ctx: &TurnContext) -> String {
        self.dialogue
            .line(ctx.archetype, ctx.phase, &ctx.listener_name, &mut self.rng)
    }

    // ---- Invariants ----

    /// Check registry consistency.
    ///
    /// - every conversation has two distinct, existing participants that
    ///   point back at it
    /// - every agent's conversation exists and lists the agent
    /// - no conversing agent is walking
    /// - no conversation holds more messages than the cap
    pub fn verify_invariants(&self) -> Result<()> {
        let max = self.config.conversation.max_messages;
        for conv in self.conversations.values() {
            let [a, b] = conv.participants;
            if a == b {
                return Err(TownError::InvariantViolation(format!(
                    "{} has the same participant twice",
                    conv.id
                )));
            }
            for p in conv.participants {
                let agent = self.agents.get(&p).ok_or_else(|| {
                    TownError::InvariantViolation(format!("{} lists missing {p}", conv.id))
                })?;
                if agent.current_conversation != Some(conv.id) {
                    return Err(TownError::InvariantViolation(format!(
                        "{p} is in {} but points at {:?}",
                        conv.id, agent.current_conversation
                    )));
                }
            }
            if conv.messages.len() > max {
                return Err(TownError::InvariantViolation(format!(
                    "{} holds {} messages",
                    conv.id,
                    conv.messages.len()
                )));
            }
        }

        for agent in self.agents.values() {
            if let Some(c) = agent.current_conversation {
                let listed = self
                    .conversations
                    .get(&c)
                    .is_some_and(|conv| conv.involves(agent.id));
                if !listed {
                    return Err(TownError::InvariantViolation(format!(
                        "{} points at {c} which does not list it",
                        agent.id
                    )));
                }
                if agent.is_moving {
                    return Err(TownError::InvariantViolation(format!(
                        "{} is walking during {c}",
                        agent.id
                    )));
                }
            }
        }
        Ok(())
    }
}
