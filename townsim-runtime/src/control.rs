//! Control surface for UI-level callers.
//!
//! Operations report success as `bool` (or an id) and never panic; the
//! reason for a rejection is logged at debug level. Anything that starts a
//! conversation schedules its opening turn, anything that ends one cancels
//! its pending turns.

use townsim_core::{
    AgentId, AgentStatus, Conversation, ConversationId, EndReason, ForceTalk, Position, TownError,
};
use tracing::debug;

use crate::simulation::Simulation;

fn rejected(op: &'static str, e: &TownError) -> bool {
    debug!(op, error = %e, "control operation rejected");
    false
}

impl Simulation {
    /// Add a user-controlled agent.
    pub fn add_user_agent(&self, name: &str, position: Position) -> AgentId {
        self.inner.world.lock().spawn_user_agent(name, position)
    }

    /// Remove a user-controlled agent, ending its conversation.
    pub fn remove_user_agent(&self, id: AgentId) -> bool {
        let now = self.now();
        let removed = self.inner.world.lock().remove_user_agent(id, now);
        match removed {
            Ok(ended) => {
                if let Some(conv) = ended {
                    self.inner.scheduler.cancel(conv);
                }
                true
            }
            Err(e) => rejected("remove_user_agent", &e),
        }
    }

    /// Teleport a user-controlled agent.
    pub fn move_user_agent(&self, id: AgentId, position: Position) -> bool {
        let moved = self.inner.world.lock().move_user_agent(id, position);
        moved.map_or_else(|e| rejected("move_user_agent", &e), |()| true)
    }

    /// A user-controlled agent says `text` to `to`.
    ///
    /// On success exactly one reply turn is scheduled for the NPC.
    pub fn send_user_message(&self, from: AgentId, to: AgentId, text: &str) -> bool {
        let now = self.now();
        let sent = self.inner.world.lock().send_user_message(from, to, text, now);
        match sent {
            Ok((conv, follow_up)) => {
                self.handle_follow_up(conv, follow_up);
                true
            }
            Err(e) => rejected("send_user_message", &e),
        }
    }

    /// Add an NPC with a custom identity.
    pub fn create_custom_npc(
        &self,
        name: &str,
        identity: &str,
        goal: Option<&str>,
        position: Option<Position>,
    ) -> AgentId {
        self.inner
            .world
            .lock()
            .create_custom_npc(name, identity, goal, position)
    }

    /// Give an NPC a new top goal and let it act on it right away.
    pub fn give_npc_goal(&self, id: AgentId, goal: &str) -> bool {
        let now = self.now();
        let given = self.inner.world.lock().give_goal(id, goal, now);
        match given {
            Ok(decision) => {
                if let Some(conv) = decision.and_then(|d| d.conversation) {
                    self.schedule_opening(conv);
                }
                true
            }
            Err(e) => rejected("give_npc_goal", &e),
        }
    }

    /// Send an idle or walking NPC to `position`.
    pub fn direct_npc_move(&self, id: AgentId, position: Position) -> bool {
        let moved = self.inner.world.lock().direct_npc_move(id, position);
        moved.map_or_else(|e| rejected("direct_npc_move", &e), |()| true)
    }

    /// Make NPC `a` talk to NPC `b`, walking over first if needed.
    pub fn force_npc_talk(&self, a: AgentId, b: AgentId) -> bool {
        let now = self.now();
        let forced = self.inner.world.lock().force_talk(a, b, now);
        match forced {
            Ok(ForceTalk::Started(conv)) => {
                self.schedule_opening(conv);
                true
            }
            Ok(ForceTalk::Approaching { .. }) => true,
            Err(e) => rejected("force_npc_talk", &e),
        }
    }

    /// End a conversation early.
    pub fn end_conversation(&self, conversation: ConversationId) -> bool {
        let now = self.now();
        let ended = self
            .inner
            .world
            .lock()
            .end_conversation(conversation, EndReason::Ended, now);
        match ended {
            Ok(_) => {
                self.inner.scheduler.cancel(conversation);
                true
            }
            Err(e) => rejected("end_conversation", &e),
        }
    }

    /// Status snapshot of one agent.
    #[must_use]
    pub fn npc_status(&self, id: AgentId) -> Option<AgentStatus> {
        let now = self.now();
        self.inner.world.lock().status(id, now)
    }

    /// Status snapshots of every NPC, in id order.
    #[must_use]
    pub fn all_npc_statuses(&self) -> Vec<AgentStatus> {
        let now = self.now();
        self.inner.world.lock().npc_statuses(now)
    }

    /// Copy of an active conversation.
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.inner.world.lock().conversation(id).cloned()
    }

    /// Copies of every active conversation.
    #[must_use]
    pub fn active_conversations(&self) -> Vec<Conversation> {
        self.inner.world.lock().conversations().cloned().collect()
    }

    /// Remove everything. Pending turns are cancelled.
    pub fn clear_world(&self) {
        self.inner.scheduler.cancel_all();
        self.inner.world.lock().clear_world();
    }

    /// Remove everything and reseed the default cast.
    pub fn reset_world(&self) -> Vec<AgentId> {
        self.inner.scheduler.cancel_all();
        self.inner.world.lock().reset_world()
    }
}
