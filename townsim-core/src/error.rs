//! Error types for the townsim core library.

use thiserror::Error;

use crate::types::{AgentId, ConversationId};

/// Top-level error type for world and control operations.
#[derive(Error, Debug)]
pub enum TownError {
    /// No agent with the given id exists in the world.
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    /// No active conversation with the given id exists.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// The agent is already in a conversation (or otherwise occupied).
    #[error("Agent {0} is busy")]
    AgentBusy(AgentId),

    /// Operation requires a user-controlled agent.
    #[error("Agent {0} is not user-controlled")]
    NotUserControlled(AgentId),

    /// Operation requires an NPC, but the agent is user-controlled.
    #[error("Agent {0} is user-controlled")]
    UserControlled(AgentId),

    /// An agent tried to talk to itself.
    #[error("Agent {0} cannot converse with itself")]
    SelfConversation(AgentId),

    /// The agent is not a participant of the conversation.
    #[error("Agent {agent} is not part of {conversation}")]
    NotParticipant {
        /// The agent that tried to speak.
        agent: AgentId,
        /// The conversation it tried to speak in.
        conversation: ConversationId,
    },

    /// Target is too far away for the requested interaction.
    #[error("Target out of range: {distance:.1} > {max:.1}")]
    OutOfRange {
        /// Actual distance between the agents.
        distance: f32,
        /// Maximum allowed distance.
        max: f32,
    },

    /// A message with no content was submitted.
    #[error("Message is empty")]
    EmptyMessage,

    /// A goal with no content was submitted.
    #[error("Goal is empty")]
    EmptyGoal,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A world invariant does not hold.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TownError>;
