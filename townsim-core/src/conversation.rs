//! Conversations: bounded two-party exchanges of turn-based messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::config::ConversationConfig;
use crate::types::{AgentId, ConversationId, SimTime};

/// Which part of a conversation a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Opening line.
    Start,
    /// Any line in the middle.
    Continue,
    /// The final line.
    Leave,
}

impl Phase {
    /// Token budget for this phase.
    #[must_use]
    pub fn max_tokens(self, config: &ConversationConfig) -> u32 {
        match self {
            Self::Start => config.start_max_tokens,
            Self::Continue => config.continue_max_tokens,
            Self::Leave => config.leave_max_tokens,
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who said it.
    pub speaker: AgentId,
    /// What was said.
    pub text: String,
    /// When it was said.
    pub timestamp: SimTime,
}

/// Why a conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Reached the message cap.
    MessageCap,
    /// Ran past the maximum duration.
    TimedOut,
    /// Ended by an external command.
    Ended,
    /// A participant was removed from the world.
    ParticipantRemoved,
}

/// An active two-party conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique id.
    pub id: ConversationId,
    /// Exactly two agents; the initiator first.
    pub participants: [AgentId; 2],
    /// Append-only message log.
    pub messages: Vec<Message>,
    /// When the conversation started.
    pub started_at: SimTime,
}

impl Conversation {
    /// Create an empty conversation between `initiator` and `responder`.
    #[must_use]
    pub fn new(id: ConversationId, initiator: AgentId, responder: AgentId, now: SimTime) -> Self {
        Self {
            id,
            participants: [initiator, responder],
            messages: Vec::new(),
            started_at: now,
        }
    }

    /// Whether `agent` takes part.
    #[must_use]
    pub fn involves(&self, agent: AgentId) -> bool {
        self.participants.contains(&agent)
    }

    /// The participant that is not `agent`.
    #[must_use]
    pub fn other(&self, agent: AgentId) -> Option<AgentId> {
        match self.participants {
            [a, b] if a == agent => Some(b),
            [a, b] if b == agent => Some(a),
            _ => None,
        }
    }

    /// Whether the message cap is reached.
    #[must_use]
    pub fn is_full(&self, max_messages: usize) -> bool {
        self.messages.len() >= max_messages
    }

    /// Whether the conversation has run longer than `max`.
    #[must_use]
    pub fn is_expired(&self, now: SimTime, max: Duration) -> bool {
        now.since(self.started_at) > max
    }

    /// The last `n` messages, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Message] {
        let skip = self.messages.len().saturating_sub(n);
        &self.messages[skip..]
    }

    /// The phase a turn actually uses.
    ///
    /// An empty conversation always opens; a turn that will produce the
    /// final message under the cap is a farewell.
    #[must_use]
    pub fn effective_phase(&self, requested: Phase, max_messages: usize) -> Phase {
        if self.messages.is_empty() {
            Phase::Start
        } else if self.messages.len() + 1 >= max_messages {
            Phase::Leave
        } else if requested == Phase::Start {
            Phase::Continue
        } else {
            requested
        }
    }
}

/// Everything needed to produce one line, detached from the world so the
/// caller can release its lock while generating.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Conversation the line belongs to.
    pub conversation: ConversationId,
    /// Who speaks.
    pub speaker: AgentId,
    /// Speaker's display name.
    pub speaker_name: String,
    /// Speaker's identity text.
    pub speaker_identity: String,
    /// Speaker's archetype, for fallback lines.
    pub archetype: Archetype,
    /// Who listens.
    pub listener: AgentId,
    /// Listener's display name.
    pub listener_name: String,
    /// Phase after [`Conversation::effective_phase`].
    pub phase: Phase,
    /// Recent messages as `(speaker name, text)`.
    pub history: Vec<(String, String)>,
    /// Token budget for the phase.
    pub max_tokens: u32,
    /// Character cap for the cleaned line.
    pub max_chars: usize,
}

impl TurnContext {
    /// History formatted as `Speaker: text` lines.
    #[must_use]
    pub fn history_lines(&self) -> String {
        self.history
            .iter()
            .map(|(name, text)| format!("{name}: {text}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
