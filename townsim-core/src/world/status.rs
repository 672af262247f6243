//! Read-only per-agent snapshots for observers and UI callers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SimulationWorld;
use crate::agent::Agent;
use crate::types::{AgentId, ConversationId, Position, SimTime};

/// Memories shown in a status snapshot.
const STATUS_MEMORIES: usize = 5;

/// Coarse activity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Standing around.
    Idle,
    /// Walking somewhere.
    Moving,
    /// In a conversation.
    Conversing,
}

/// Snapshot of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// What the agent is doing.
    pub activity: Activity,
    /// Goals, most urgent first.
    pub goals: Vec<String>,
    /// Newest memory notes, oldest first.
    pub recent_memories: Vec<String>,
    /// Current position.
    pub position: Position,
    /// Walking target.
    pub target: Option<Position>,
    /// Whether a user steers this agent.
    pub is_user_controlled: bool,
    /// Active conversation.
    pub conversation: Option<ConversationId>,
    /// Name of the conversation partner.
    pub conversation_partner: Option<String>,
    /// Speech bubble text, if still fresh.
    pub last_message: Option<String>,
}

impl SimulationWorld {
    /// Snapshot of one agent.
    #[must_use]
    pub fn status(&self, id: AgentId, now: SimTime) -> Option<AgentStatus> {
        self.agents.get(&id).map(|a| self.snapshot(a, now))
    }

    /// Snapshots of every NPC, in id order.
    #[must_use]
    pub fn npc_statuses(&self, now: SimTime) -> Vec<AgentStatus> {
        self.agents
            .values()
            .filter(|a| !a.is_user_controlled)
            .map(|a| self.snapshot(a, now))
            .collect()
    }

    fn snapshot(&self, agent: &Agent, now: SimTime) -> AgentStatus {
        let activity = if agent.current_conversation.is_some() {
            Activity::Conversing
        } else if agent.is_moving {
            Activity::Moving
        } else {
            Activity::Idle
        };
        let partner = agent
            .current_conversation
            .and_then(|c| self.conversations.get(&c))
            .and_then(|c| c.other(agent.id))
            .and_then(|p| self.agents.get(&p))
            .map(|p| p.name.clone());
        let ttl = Duration::from_millis(self.config.conversation.message_ttl_ms);

        AgentStatus {
            id: agent.id,
            name: agent.name.clone(),
            activity,
            goals: agent.goals.clone(),
            recent_memories: agent.recent_memories(STATUS_MEMORIES),
            position: agent.position,
            target: agent.target_position,
            is_user_controlled: agent.is_user_controlled,
            conversation: agent.current_conversation,
            conversation_partner: partner,
            last_message: agent.visible_message(now, ttl).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::config::TownConfig;

    #[test]
    fn activity_follows_state() {
        let mut w = SimulationWorld::new(TownConfig::default()).expect("valid config");
        let a = w.spawn_npc("Rosa", "", Archetype::Baker, Position::new(10.0, 10.0), &[]);
        let b = w.spawn_npc("Finn", "", Archetype::Wanderer, Position::new(20.0, 10.0), &[]);
        let c = w.spawn_npc("Greta", "", Archetype::Merchant, Position::new(30.0, 10.0), &[]);
        w.spawn_user_agent("Player", Position::default());

        w.direct_npc_move(c, Position::new(300.0, 300.0)).expect("move");
        let conv = w.start_conversation(a, b, SimTime::ZERO).expect("start");
        w.record_message(conv, a, "Fresh rolls today!", SimTime::ZERO).expect("record");

        let statuses = w.npc_statuses(SimTime::from_secs(1));
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].activity, Activity::Conversing);
        assert_eq!(statuses[0].conversation_partner.as_deref(), Some("Finn"));
        assert_eq!(statuses[0].last_message.as_deref(), Some("Fresh rolls today!"));
        assert_eq!(statuses[2].activity, Activity::Moving);

        let later = w.status(a, SimTime::from_secs(30)).expect("status");
        assert_eq!(later.last_message, None);
    }

    #[test]
    fn status_serializes_to_json() {
        let mut w = SimulationWorld::new(TownConfig::default()).expect("valid config");
        let a = w.spawn_npc("Mabel", "", Archetype::Recluse, Position::new(10.0, 10.0), &["water the garden"]);
        let json = serde_json::to_value(w.status(a, SimTime::ZERO).expect("status")).expect("json");
        assert_eq!(json["activity"], "idle");
        assert_eq!(json["goals"][0], "water the garden");
    }
}
