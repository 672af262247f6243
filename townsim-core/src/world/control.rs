//! External control operations used by UI-level callers.
//!
//! Every operation validates its preconditions and returns a typed error
//! instead of partially applying.

use tracing::{debug, info};

use super::{SimulationWorld, TurnFollowUp};
use crate::agent::Agent;
use crate::archetype::Archetype;
use crate::decision::Decision;
use crate::error::{Result, TownError};
use crate::movement::standoff_point;
use crate::types::{AgentId, ConversationId, Position, SimTime};

/// Outcome of [`SimulationWorld::force_talk`].
#[derive(Debug, Clone, PartialEq)]
pub enum ForceTalk {
    /// The two were close enough; the conversation has started.
    Started(ConversationId),
    /// The initiator is walking over with a "talk to" goal on top.
    Approaching {
        /// Stand-off point the initiator walks to.
        destination: Position,
    },
}

impl SimulationWorld {
    /// Add a user-controlled agent.
    pub fn spawn_user_agent(&mut self, name: &str, position: Position) -> AgentId {
        let id = self.allocate_agent_id();
        let position = position.clamped(self.config.world.width, self.config.world.height);
        self.agents.insert(id, Agent::user(id, name, position));
        info!(agent = %id, name, "user agent joined");
        id
    }

    /// Remove a user-controlled agent, ending its conversation.
    pub fn remove_user_agent(&mut self, id: AgentId, now: SimTime) -> Result<Option<ConversationId>> {
        if !self.agent_ref(id)?.is_user_controlled {
            return Err(TownError::NotUserControlled(id));
        }
        self.remove_agent(id, now)
    }

    /// Teleport a user-controlled agent.
    pub fn move_user_agent(&mut self, id: AgentId, position: Position) -> Result<()> {
        let (w, h) = (self.config.world.width, self.config.world.height);
        let agent = self.agent_mut_ref(id)?;
        if !agent.is_user_controlled {
            return Err(TownError::NotUserControlled(id));
        }
        agent.stop();
        agent.position = position.clamped(w, h);
        Ok(())
    }

    /// Send an NPC walking to `position`.
    ///
    /// Rejected for user-controlled or conversing agents.
    pub fn direct_npc_move(&mut self, id: AgentId, position: Position) -> Result<()> {
        let (w, h) = (self.config.world.width, self.config.world.height);
        let agent = self.agent_mut_ref(id)?;
        if agent.is_user_controlled {
            return Err(TownError::UserControlled(id));
        }
        if agent.current_conversation.is_some() {
            return Err(TownError::AgentBusy(id));
        }
        let target = position.clamped(w, h);
        agent.set_destination(target);
        agent.travel_goal = None;
        debug!(agent = %id, %target, "NPC directed");
        Ok(())
    }

    /// A user-controlled agent says `text` to `to`.
    ///
    /// The pair must be within the direct-message distance. A free target
    /// is pulled into a new conversation with the user speaking first;
    /// an ongoing conversation between the two continues. The returned
    /// follow-up says who answers next.
    pub fn send_user_message(
        &mut self,
        from: AgentId,
        to: AgentId,
        text: &str,
        now: SimTime,
    ) -> Result<(ConversationId, TurnFollowUp)> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TownError::EmptyMessage);
        }
        if from == to {
            return Err(TownError::SelfConversation(from));
        }
        let sender = self.agent_ref(from)?;
        if !sender.is_user_controlled {
            return Err(TownError::NotUserControlled(from));
        }
        let target = self.agent_ref(to)?;

        let distance = sender.position.distance_to(&target.position);
        let max = self.config.conversation.direct_message_distance;
        if distance > max {
            return Err(TownError::OutOfRange { distance, max });
        }

        let conv = match (sender.current_conversation, target.current_conversation) {
            (Some(a), Some(b)) if a == b => a,
            (Some(_), _) => return Err(TownError::AgentBusy(from)),
            (_, Some(_)) => return Err(TownError::AgentBusy(to)),
            (None, None) => self.start_conversation(from, to, now)?,
        };

        let follow = self.record_message(conv, from, text, now)?;
        Ok((conv, follow))
    }

    /// Add an NPC with a custom identity and no canned dialogue.
    ///
    /// Without an explicit position it appears at a random spot.
    pub fn create_custom_npc(
        &mut self,
        name: &str,
        identity: &str,
        goal: Option<&str>,
        position: Option<Position>,
    ) -> AgentId {
        let position = match position {
            Some(p) => p,
            None => self.random_position(),
        };
        let goals: Vec<&str> = goal.map(str::trim).filter(|g| !g.is_empty()).into_iter().collect();
        self.spawn_npc(name, identity, Archetype::Custom, position, &goals)
    }

    /// Put `goal` on top of an NPC's goals and re-evaluate it at once.
    ///
    /// A conversing NPC keeps the goal but is not re-evaluated.
    pub fn give_goal(&mut self, id: AgentId, goal: &str, now: SimTime) -> Result<Option<Decision>> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(TownError::EmptyGoal);
        }
        let cap = self.config.memory.max_goals;
        let agent = self.agent_mut_ref(id)?;
        if agent.is_user_controlled {
            return Err(TownError::UserControlled(id));
        }
        agent.push_goal(goal, cap);
        let conversing = agent.current_conversation.is_some();
        info!(agent = %id, goal, "goal injected");

        if conversing {
            return Ok(None);
        }
        self.evaluate_agent(id, now).map(Some)
    }

    /// Make NPC `a` talk to NPC `b`.
    ///
    /// Within trigger distance the conversation starts at once. Otherwise
    /// `a` walks to a stand-off point near `b` with "talk to <b>" as its
    /// top goal, and `b` stops to wait. The conversation then starts on
    /// arrival if `b` is still free and in reach.
    pub fn force_talk(&mut self, a: AgentId, b: AgentId, now: SimTime) -> Result<ForceTalk> {
        if a == b {
            return Err(TownError::SelfConversation(a));
        }
        let first = self.agent_ref(a)?;
        let second = self.agent_ref(b)?;
        for agent in [first, second] {
            if agent.is_user_controlled {
                return Err(TownError::UserControlled(agent.id));
            }
            if agent.current_conversation.is_some() {
                return Err(TownError::AgentBusy(agent.id));
            }
        }

        let reach = self.config.conversation.trigger_distance;
        if first.position.distance_to(&second.position) <= reach {
            return self.start_conversation(a, b, now).map(ForceTalk::Started);
        }

        let destination = standoff_point(first.position, second.position, reach * 0.5);
        let goal = format!("talk to {}", second.name);
        let cap = self.config.memory.max_goals;

        let walker = self.agent_mut_ref(a)?;
        walker.push_goal(goal, cap);
        walker.set_destination(destination);
        walker.travel_goal = None;
        self.agent_mut_ref(b)?.stop();

        debug!(from = %a, to = %b, %destination, "walking over to talk");
        Ok(ForceTalk::Approaching { destination })
    }

    /// Remove every agent and conversation. Ids keep counting up.
    pub fn clear_world(&mut self) {
        self.conversations.clear();
        self.agents.clear();
        info!("world cleared");
    }

    /// Clear the world and reseed the default cast.
    pub fn reset_world(&mut self) -> Vec<AgentId> {
        self.clear_world();
        self.seed_default_cast()
    }
}
