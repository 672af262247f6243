//! Agents: simulated characters, NPC or user-controlled.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::types::{AgentId, ConversationId, Position, SimTime};

/// A simulated character with a position, identity and behavioral state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique, stable identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Free-text personality description.
    pub identity: String,
    /// Fallback dialogue archetype.
    pub archetype: Archetype,
    /// Goals, most urgent first.
    pub goals: Vec<String>,
    /// Current position.
    pub position: Position,
    /// Where the agent is walking to, cleared on arrival.
    pub target_position: Option<Position>,
    /// Whether the agent is walking.
    pub is_moving: bool,
    /// The one conversation this agent is part of, if any.
    pub current_conversation: Option<ConversationId>,
    /// User-controlled agents are skipped by the decision engine.
    pub is_user_controlled: bool,
    /// Recency buffer of short notes, newest last.
    pub memories: VecDeque<String>,
    /// Last line this agent spoke.
    pub last_message: Option<String>,
    /// When `last_message` was spoken.
    pub last_message_at: Option<SimTime>,
    /// When this agent's last conversation ended.
    pub last_conversation_end: Option<SimTime>,
    /// Goal that the current walk serves; consumed on arrival.
    pub travel_goal: Option<String>,
}

impl Agent {
    /// Create an NPC.
    #[must_use]
    pub fn npc(
        id: AgentId,
        name: impl Into<String>,
        identity: impl Into<String>,
        archetype: Archetype,
        position: Position,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            identity: identity.into(),
            archetype,
            goals: Vec::new(),
            position,
            target_position: None,
            is_moving: false,
            current_conversation: None,
            is_user_controlled: false,
            memories: VecDeque::new(),
            last_message: None,
            last_message_at: None,
            last_conversation_end: None,
            travel_goal: None,
        }
    }

    /// Create a user-controlled agent.
    #[must_use]
    pub fn user(id: AgentId, name: impl Into<String>, position: Position) -> Self {
        let name = name.into();
        let identity = format!("{name} is a visitor exploring the town.");
        let mut agent = Self::npc(id, name, identity, Archetype::Custom, position);
        agent.is_user_controlled = true;
        agent
    }

    /// Not walking and not in a conversation.
    #[must_use]
    pub fn is_free(&self) -> bool {
        !self.is_moving && self.current_conversation.is_none()
    }

    /// Append a memory note, evicting the oldest beyond `cap`.
    pub fn remember(&mut self, note: impl Into<String>, cap: usize) {
        self.memories.push_back(note.into());
        while self.memories.len() > cap {
            self.memories.pop_front();
        }
    }

    /// The `n` most recent memory notes, oldest first.
    #[must_use]
    pub fn recent_memories(&self, n: usize) -> Vec<String> {
        let skip = self.memories.len().saturating_sub(n);
        self.memories.iter().skip(skip).cloned().collect()
    }

    /// Insert a goal at the highest priority, dropping the least urgent
    /// beyond `cap`.
    pub fn push_goal(&mut self, goal: impl Into<String>, cap: usize) {
        self.goals.insert(0, goal.into());
        self.goals.truncate(cap.max(1));
    }

    /// Remove the first goal equal to `goal` (case-insensitive).
    pub fn consume_goal(&mut self, goal: &str) -> bool {
        if let Some(idx) = self.goals.iter().position(|g| g.eq_ignore_ascii_case(goal)) {
            self.goals.remove(idx);
            true
        } else {
            false
        }
    }

    /// Name of the agent the top goal asks to talk to, if it is a
    /// "talk to X" goal.
    #[must_use]
    pub fn talk_goal_target(&self) -> Option<&str> {
        self.goals.first().and_then(|g| parse_talk_goal(g))
    }

    /// Start walking towards `target`.
    pub fn set_destination(&mut self, target: Position) {
        self.target_position = Some(target);
        self.is_moving = true;
    }

    /// Stop walking, keeping the current position.
    pub fn stop(&mut self) {
        self.target_position = None;
        self.is_moving = false;
        self.travel_goal = None;
    }

    /// Record a spoken line for transient display.
    pub fn say(&mut self, text: impl Into<String>, now: SimTime) {
        self.last_message = Some(text.into());
        self.last_message_at = Some(now);
    }

    /// The last spoken line if it is younger than `ttl`.
    #[must_use]
    pub fn visible_message(&self, now: SimTime, ttl: Duration) -> Option<&str> {
        match (&self.last_message, self.last_message_at) {
            (Some(text), Some(at)) if now.since(at) < ttl => Some(text.as_str()),
            _ => None,
        }
    }

    /// Whether this agent's last conversation ended within `window`.
    #[must_use]
    pub fn conversed_within(&self, now: SimTime, window: Duration) -> bool {
        self.last_conversation_end
            .is_some_and(|end| now.since(end) < window)
    }

    /// Deterministic "home" location derived from the agent's id.
    ///
    /// The same agent always gets the same home on a map of a given size.
    #[must_use]
    pub fn home_position(&self, width: f32, height: f32) -> Position {
        let h = mix64(self.id.0);
        let fx = (h & 0xFFFF) as f32 / 65_535.0;
        let fy = ((h >> 16) & 0xFFFF) as f32 / 65_535.0;
        // Keep homes off the map edge.
        Position::new(width * (0.1 + 0.8 * fx), height * (0.1 + 0.8 * fy))
    }
}

/// Parse `"talk to <name>"` (case-insensitive) into `<name>`.
#[must_use]
pub fn parse_talk_goal(goal: &str) -> Option<&str> {
    const PREFIX: &str = "talk to ";
    let head = goal.get(..PREFIX.len())?;
    if head.eq_ignore_ascii_case(PREFIX) {
        let name = goal[PREFIX.len()..].trim();
        (!name.is_empty()).then_some(name)
    } else {
        None
    }
}

/// SplitMix64 finalizer.
fn mix64(mut h: u64) -> u64 {
    h = h.wrapping_add(0x9e37_79b9_7f4a_7c15);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Agent {
        Agent::npc(AgentId(1), "Rosa", "friendly baker", Archetype::Baker, Position::default())
    }

    #[test]
    fn memory_buffer_evicts_oldest() {
        let mut a = agent();
        for i in 0..5 {
            a.remember(format!("note {i}"), 3);
        }
        assert_eq!(a.memories.len(), 3);
        assert_eq!(a.memories.front().map(String::as_str), Some("note 2"));
        assert_eq!(a.recent_memories(2), vec!["note 3".to_string(), "note 4".to_string()]);
    }

    #[test]
    fn push_goal_goes_first_and_caps() {
        let mut a = agent();
        a.push_goal("bake bread", 2);
        a.push_goal("talk to Finn", 2);
        a.push_goal("explore forest", 2);
        assert_eq!(a.goals, vec!["explore forest".to_string(), "talk to Finn".to_string()]);
    }

    #[test]
    fn talk_goal_parsing() {
        assert_eq!(parse_talk_goal("talk to Finn"), Some("Finn"));
        assert_eq!(parse_talk_goal("Talk To  Greta "), Some("Greta"));
        assert_eq!(parse_talk_goal("talk to "), None);
        assert_eq!(parse_talk_goal("walk to the park"), None);
    }

    #[test]
    fn home_is_stable_and_on_map() {
        let a = agent();
        let h1 = a.home_position(800.0, 600.0);
        let h2 = a.home_position(800.0, 600.0);
        assert_eq!(h1, h2);
        assert!((0.0..=800.0).contains(&h1.x));
        assert!((0.0..=600.0).contains(&h1.y));

        let other = Agent::npc(AgentId(2), "Finn", "", Archetype::Wanderer, Position::default());
        assert_ne!(other.home_position(800.0, 600.0), h1);
    }

    #[test]
    fn visible_message_expires() {
        let mut a = agent();
        a.say("Fresh bread!", SimTime::from_secs(1));
        let ttl = Duration::from_secs(10);
        assert_eq!(a.visible_message(SimTime::from_secs(5), ttl), Some("Fresh bread!"));
        assert_eq!(a.visible_message(SimTime::from_secs(11), ttl), None);
    }

    #[test]
    fn user_agents_are_flagged() {
        let u = Agent::user(AgentId(9), "Player", Position::default());
        assert!(u.is_user_controlled);
        assert_eq!(u.archetype, Archetype::Custom);
        assert!(u.is_free());
    }
}
