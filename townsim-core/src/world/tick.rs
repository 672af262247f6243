//! One simulation step and the decision engine driver.
//!
//! Order within a tick:
//! 1. Movement (arrivals consume travel goals and may start a "talk to"
//!    conversation)
//! 2. Proximity-triggered conversations
//! 3. Expiry of conversations past their maximum duration
//! 4. Decisions for free NPCs (throttled by a per-agent roll)

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use super::SimulationWorld;
use crate::agent::parse_talk_goal;
use crate::conversation::EndReason;
use crate::decision::{
    Decision, DecisionKind, DecisionTarget, Neighbor, choose_weighted, score_options,
};
use crate::error::{Result, TownError};
use crate::movement::{StepOutcome, advance};
use crate::types::{AgentId, ConversationId, SimTime};

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Agents that reached their destination.
    pub arrivals: Vec<AgentId>,
    /// Conversations started this tick, by any path. Each needs an opening
    /// turn from its initiator.
    pub started: Vec<ConversationId>,
    /// Conversations that ran out of time.
    pub expired: Vec<ConversationId>,
    /// Decisions taken this tick.
    pub decisions: Vec<Decision>,
}

impl TickReport {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.arrivals.is_empty()
            && self.started.is_empty()
            && self.expired.is_empty()
            && self.decisions.is_empty()
    }
}

impl SimulationWorld {
    /// Advance the world by one tick at time `now`.
    pub fn tick(&mut self, now: SimTime) -> TickReport {
        let mut report = TickReport::default();
        self.update_movement(now, &mut report);
        self.trigger_proximity_conversations(now, &mut report);
        self.expire_conversations(now, &mut report);
        self.run_decisions(now, &mut report);
        report
    }

    fn update_movement(&mut self, now: SimTime, report: &mut TickReport) {
        let ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for id in ids {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            if advance(agent, &self.config.movement) != StepOutcome::Arrived {
                continue;
            }
            report.arrivals.push(id);
            if let Some(goal) = agent.travel_goal.take() {
                if agent.consume_goal(&goal) {
                    debug!(agent = %id, goal = %goal, "travel goal fulfilled");
                }
            }

            if let Some(conv) = self.talk_on_arrival(id, now) {
                report.started.push(conv);
            }
        }
    }

    /// Start a conversation if `id` just arrived near the agent its top
    /// "talk to" goal names.
    fn talk_on_arrival(&mut self, id: AgentId, now: SimTime) -> Option<ConversationId> {
        let agent = self.agents.get(&id)?;
        if agent.current_conversation.is_some() {
            return None;
        }
        let wanted = agent.goals.first().and_then(|g| parse_talk_goal(g))?;
        let reach = self.config.conversation.trigger_distance;
        let partner = self
            .agents
            .values()
            .find(|o| {
                o.id != id
                    && o.current_conversation.is_none()
                    && o.name.eq_ignore_ascii_case(wanted)
                    && o.position.distance_to(&agent.position) <= reach
            })?
            .id;
        self.start_conversation(id, partner, now).ok()
    }

    fn trigger_proximity_conversations(&mut self, now: SimTime, report: &mut TickReport) {
        let cfg = &self.config.conversation;
        let cooldown = Duration::from_millis(cfg.proximity_cooldown_ms);
        let reach = cfg.trigger_distance;
        let probability = f64::from(cfg.trigger_probability);

        let pool: Vec<(AgentId, crate::types::Position)> = self
            .agents
            .values()
            .filter(|a| a.is_free() && !a.is_user_controlled && !a.conversed_within(now, cooldown))
            .map(|a| (a.id, a.position))
            .collect();

        let mut taken = vec![false; pool.len()];
        for i in 0..pool.len() {
            for j in (i + 1)..pool.len() {
                if taken[i] {
                    break;
                }
                if taken[j] || pool[i].1.distance_to(&pool[j].1) > reach {
                    continue;
                }
                if !self.rng.gen_bool(probability) {
                    continue;
                }
                match self.start_conversation(pool[i].0, pool[j].0, now) {
                    Ok(conv) => {
                        taken[i] = true;
                        taken[j] = true;
                        report.started.push(conv);
                    }
                    Err(e) => debug!(error = %e, "proximity pairing skipped"),
                }
            }
        }
    }

    fn expire_conversations(&mut self, now: SimTime, report: &mut TickReport) {
        let max = Duration::from_millis(self.config.conversation.max_duration_ms);
        let expired: Vec<ConversationId> = self
            .conversations
            .values()
            .filter(|c| c.is_expired(now, max))
            .map(|c| c.id)
            .collect();
        for id in expired {
            if self.end_conversation(id, EndReason::TimedOut, now).is_ok() {
                report.expired.push(id);
            }
        }
    }

    fn run_decisions(&mut self, now: SimTime, report: &mut TickReport) {
        let probability = f64::from(self.config.decision.evaluation_probability);
        let candidates: Vec<AgentId> = self
            .agents
            .values()
            .filter(|a| a.is_free() && !a.is_user_controlled)
            .map(|a| a.id)
            .collect();

        for id in candidates {
            // An earlier decision this tick may have pulled this agent in.
            if !self.agents.get(&id).is_some_and(|a| a.is_free()) {
                continue;
            }
            if !self.rng.gen_bool(probability) {
                continue;
            }
            match self.evaluate_agent(id, now) {
                Ok(decision) => {
                    if let Some(conv) = decision.conversation {
                        report.started.push(conv);
                    }
                    report.decisions.push(decision);
                }
                Err(e) => debug!(agent = %id, error = %e, "decision skipped"),
            }
        }
    }

    /// Score, choose and execute one decision for `id` right now.
    ///
    /// Works on a walking agent too (the new choice replaces the walk), but
    /// not on one that is conversing or user-controlled.
    pub fn evaluate_agent(&mut self, id: AgentId, now: SimTime) -> Result<Decision> {
        let agent = self.agents.get(&id).ok_or(TownError::AgentNotFound(id))?;
        if agent.is_user_controlled {
            return Err(TownError::UserControlled(id));
        }
        if agent.current_conversation.is_some() {
            return Err(TownError::AgentBusy(id));
        }

        let radius = self.config.decision.social_radius;
        let neighbors: Vec<Neighbor> = self
            .agents
            .values()
            .filter(|o| o.id != id && o.is_free() && !o.is_user_controlled)
            .filter_map(|o| {
                let distance = o.position.distance_to(&agent.position);
                (distance <= radius).then(|| Neighbor {
                    id: o.id,
                    name: o.name.clone(),
                    distance,
                })
            })
            .collect();

        let mut options = score_options(
            agent,
            &neighbors,
            now,
            &self.config,
            self.scorer.as_ref(),
            &mut self.rng,
        );
        let idx = choose_weighted(&options, &mut self.rng).unwrap_or(0);
        if idx >= options.len() {
            return Err(TownError::InvariantViolation("no decision options".into()));
        }
        let chosen = options.swap_remove(idx);

        let mut decision = Decision {
            agent: id,
            kind: chosen.kind,
            destination: None,
            conversation: None,
        };
        let cap = self.config.memory.max_memories;

        match (chosen.kind, chosen.target) {
            (DecisionKind::Socialize, Some(DecisionTarget::Agent(partner))) => {
                decision.conversation = Some(self.start_conversation(id, partner, now)?);
            }
            (DecisionKind::Explore | DecisionKind::ReturnHome, Some(DecisionTarget::Location(p))) => {
                let note = match (chosen.kind, chosen.label.as_deref()) {
                    (DecisionKind::ReturnHome, _) => "Going home".to_string(),
                    (_, Some(place)) => format!("Heading to the {place}"),
                    (_, None) => "Wandering off to explore".to_string(),
                };
                let agent = self.agent_mut_ref(id)?;
                agent.set_destination(p);
                agent.travel_goal = chosen.goal;
                agent.remember(note, cap);
                decision.destination = Some(p);
            }
            _ => {
                let agent = self.agent_mut_ref(id)?;
                agent.stop();
                agent.remember("Resting and observing the town", cap);
                decision.kind = DecisionKind::Idle;
            }
        }

        debug!(agent = %id, kind = ?decision.kind, "decision taken");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::config::TownConfig;
    use crate::types::Position;

    fn quiet_config() -> TownConfig {
        let mut config = TownConfig::default();
        config.general.seed = Some(11);
        config.decision.evaluation_probability = 0.0;
        config
    }

    #[test]
    fn proximity_pairs_close_agents_once() {
        let mut config = quiet_config();
        config.conversation.trigger_probability = 1.0;
        let mut w = SimulationWorld::new(config).expect("valid config");
        let a = w.spawn_npc("A", "", Archetype::Baker, Position::new(100.0, 100.0), &[]);
        let b = w.spawn_npc("B", "", Archetype::Scholar, Position::new(105.0, 100.0), &[]);
        let c = w.spawn_npc("C", "", Archetype::Merchant, Position::new(110.0, 100.0), &[]);

        let report = w.tick(SimTime::from_secs(1));
        assert_eq!(report.started.len(), 1);
        let conv = report.started[0];
        assert_eq!(w.agent(a).and_then(|x| x.current_conversation), Some(conv));
        assert_eq!(w.agent(b).and_then(|x| x.current_conversation), Some(conv));
        assert!(w.agent(c).is_some_and(|x| x.current_conversation.is_none()));
        w.verify_invariants().expect("consistent");
    }

    #[test]
    fn distant_agents_never_pair() {
        let mut config = quiet_config();
        config.conversation.trigger_probability = 1.0;
        let mut w = SimulationWorld::new(config).expect("valid config");
        w.spawn_npc("A", "", Archetype::Baker, Position::new(0.0, 0.0), &[]);
        w.spawn_npc("B", "", Archetype::Scholar, Position::new(500.0, 500.0), &[]);
        assert!(w.tick(SimTime::from_secs(1)).started.is_empty());
    }

    #[test]
    fn user_agents_are_not_paired_by_proximity() {
        let mut config = quiet_config();
        config.conversation.trigger_probability = 1.0;
        let mut w = SimulationWorld::new(config).expect("valid config");
        w.spawn_npc("A", "", Archetype::Baker, Position::new(100.0, 100.0), &[]);
        w.spawn_user_agent("Player", Position::new(101.0, 100.0));
        assert!(w.tick(SimTime::from_secs(1)).started.is_empty());
    }

    #[test]
    fn recent_talkers_wait_out_the_cooldown() {
        let mut config = quiet_config();
        config.conversation.trigger_probability = 1.0;
        let mut w = SimulationWorld::new(config).expect("valid config");
        let a = w.spawn_npc("A", "", Archetype::Baker, Position::new(100.0, 100.0), &[]);
        let b = w.spawn_npc("B", "", Archetype::Scholar, Position::new(105.0, 100.0), &[]);
        let conv = w.start_conversation(a, b, SimTime::ZERO).expect("start");
        w.end_conversation(conv, EndReason::Ended, SimTime::from_secs(1)).expect("end");

        assert!(w.tick(SimTime::from_secs(5)).started.is_empty());
        assert_eq!(w.tick(SimTime::from_secs(17)).started.len(), 1);
    }

    #[test]
    fn zero_cooldown_lets_a_parted_pair_talk_again() {
        let mut config = quiet_config();
        config.conversation.trigger_probability = 1.0;
        config.conversation.proximity_cooldown_ms = 0;
        let mut w = SimulationWorld::new(config).expect("valid config");
        let a = w.spawn_npc("A", "", Archetype::Baker, Position::new(100.0, 100.0), &[]);
        let b = w.spawn_npc("B", "", Archetype::Scholar, Position::new(105.0, 100.0), &[]);
        let conv = w.start_conversation(a, b, SimTime::ZERO).expect("start");
        w.end_conversation(conv, EndReason::Ended, SimTime::from_secs(1)).expect("end");

        let report = w.tick(SimTime::from_millis(1500));
        assert_eq!(report.started.len(), 1);
        assert_ne!(report.started[0], conv);
    }

    #[test]
    fn conversations_expire_after_max_duration() {
        let mut w = SimulationWorld::new(quiet_config()).expect("valid config");
        let a = w.spawn_npc("A", "", Archetype::Baker, Position::new(100.0, 100.0), &[]);
        let b = w.spawn_npc("B", "", Archetype::Scholar, Position::new(500.0, 100.0), &[]);
        let conv = w.start_conversation(a, b, SimTime::ZERO).expect("start");

        assert!(w.tick(SimTime::from_secs(60)).expired.is_empty());
        let report = w.tick(SimTime::from_millis(60_001));
        assert_eq!(report.expired, vec![conv]);
        assert!(!w.is_active(conv));
        assert!(w.agent(a).is_some_and(|x| x.current_conversation.is_none()));
    }

    #[test]
    fn arrival_consumes_travel_goal() {
        let mut w = SimulationWorld::new(quiet_config()).expect("valid config");
        let a = w.spawn_npc("A", "", Archetype::Wanderer, Position::new(100.0, 100.0), &["visit the well"]);
        {
            let agent = w.agent_mut(a).expect("agent");
            agent.set_destination(Position::new(130.0, 100.0));
            agent.travel_goal = Some("visit the well".into());
        }
        let mut now = SimTime::ZERO;
        for _ in 0..5 {
            now = now.after(Duration::from_secs(1));
            w.tick(now);
        }
        let agent = w.agent(a).expect("agent");
        assert!(!agent.is_moving);
        assert!(agent.goals.is_empty());
    }

    #[test]
    fn arrival_near_talk_target_starts_conversation() {
        let mut config = quiet_config();
        config.conversation.trigger_probability = 0.0;
        let mut w = SimulationWorld::new(config).expect("valid config");
        let a = w.spawn_npc("A", "", Archetype::Baker, Position::new(100.0, 100.0), &["talk to B"]);
        let b = w.spawn_npc("B", "", Archetype::Scholar, Position::new(200.0, 100.0), &[]);
        w.agent_mut(a).expect("a").set_destination(Position::new(160.0, 100.0));

        let mut now = SimTime::ZERO;
        let mut started = Vec::new();
        for _ in 0..6 {
            now = now.after(Duration::from_secs(1));
            started.extend(w.tick(now).started);
        }
        assert_eq!(started.len(), 1);
        assert_eq!(w.agent(b).and_then(|x| x.current_conversation), Some(started[0]));
        assert!(w.agent(a).is_some_and(|x| x.goals.is_empty()));
    }

    #[test]
    fn forced_evaluation_always_yields_a_decision() {
        let mut w = SimulationWorld::new(quiet_config()).expect("valid config");
        let a = w.spawn_npc("A", "curious explorer", Archetype::Wanderer, Position::new(400.0, 300.0), &[]);
        for i in 0..20 {
            let d = w.evaluate_agent(a, SimTime::from_secs(i)).expect("decision");
            assert_eq!(d.agent, a);
            assert!(matches!(d.kind, DecisionKind::Explore | DecisionKind::ReturnHome | DecisionKind::Idle));
            assert_eq!(d.destination.is_some(), w.agent(a).is_some_and(|x| x.is_moving));
        }
        assert!(!w.agent(a).expect("a").memories.is_empty());
    }

    #[test]
    fn decisions_skip_user_agents() {
        let mut w = SimulationWorld::new(quiet_config()).expect("valid config");
        let u = w.spawn_user_agent("Player", Position::new(10.0, 10.0));
        assert!(matches!(w.evaluate_agent(u, SimTime::ZERO), Err(TownError::UserControlled(_))));
    }
}
