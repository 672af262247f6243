//! # Townsim Core Library
//!
//! Engine-agnostic simulation of a small town: NPCs wander between points
//! of interest, bump into each other, and hold short conversations.
//!
//! Everything here is synchronous and clock-free. Callers pass the current
//! [`SimTime`] into each operation, which keeps the world deterministic
//! under a fixed seed and lets tests drive time explicitly.
//!
//! - [`SimulationWorld`] — registry of agents and conversations, the tick,
//!   and the control surface
//! - [`decision`] — scored, weighted choice of what a free NPC does next
//! - [`movement`] — straight-line walking and proximity
//! - [`conversation`] — conversation state and turn context
//! - [`fallback`] — canned per-archetype dialogue
//! - [`sanitize`] — cleaning of generated lines
//!
//! Text generation itself lives in `townsim-llm`; scheduling of deferred
//! turns lives in `townsim-runtime`.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

pub mod agent;
pub mod archetype;
pub mod config;
pub mod conversation;
pub mod decision;
pub mod error;
pub mod fallback;
pub mod movement;
pub mod personality;
pub mod sanitize;
pub mod types;
pub mod world;

pub use agent::Agent;
pub use archetype::Archetype;
pub use config::TownConfig;
pub use conversation::{Conversation, EndReason, Message, Phase, TurnContext};
pub use decision::{Decision, DecisionKind};
pub use error::TownError;
pub use sanitize::clean_response;
pub use types::*;
pub use world::{Activity, AgentStatus, ForceTalk, SimulationWorld, TickReport, TurnFollowUp};
