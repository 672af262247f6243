//! Decision engine: what a free NPC does next.
//!
//! Each evaluation scores four option kinds, then picks one by
//! priority-weighted random choice (weights are squared priorities), so the
//! best option usually wins but lower ones stay possible:
//!
//! | Option       | Priority                                  | Target                    |
//! |--------------|-------------------------------------------|---------------------------|
//! | `Socialize`  | social affinity × weight (recent chat ↓)  | nearest free neighbor     |
//! | `Explore`    | exploration affinity × weight             | point of interest / random|
//! | `ReturnHome` | constant, only with at least one memory   | id-hashed home            |
//! | `Idle`       | low constant                              | none                      |
//!
//! An option serving the agent's top goal gets a flat bonus.

use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::{DecisionConfig, TownConfig, WorldConfig};
use crate::personality::PersonalityScorer;
use crate::types::{AgentId, ConversationId, Position, SimTime};

/// Kind of behavior an agent can commit to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Start a conversation with a nearby agent.
    Socialize,
    /// Walk somewhere new.
    Explore,
    /// Walk back home.
    ReturnHome,
    /// Stay put.
    Idle,
}

/// What an option points at.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTarget {
    /// Another agent.
    Agent(AgentId),
    /// A map location.
    Location(Position),
}

/// One scored candidate behavior. Exists only within one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOption {
    /// Behavior kind.
    pub kind: DecisionKind,
    /// Unsquared priority.
    pub priority: f32,
    /// Target, if the kind has one.
    pub target: Option<DecisionTarget>,
    /// Human-readable destination name, for memory notes.
    pub label: Option<String>,
    /// Goal this option serves, consumed once it is fulfilled.
    pub goal: Option<String>,
}

/// A free agent near the one deciding.
#[derive(Debug, Clone)]
pub struct Neighbor {
    /// Agent id.
    pub id: AgentId,
    /// Display name, matched against "talk to" goals.
    pub name: String,
    /// Distance from the deciding agent.
    pub distance: f32,
}

/// Outcome of executing a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Agent that decided.
    pub agent: AgentId,
    /// Chosen kind.
    pub kind: DecisionKind,
    /// New walking target, for movement kinds.
    pub destination: Option<Position>,
    /// Conversation started, for `Socialize`.
    pub conversation: Option<ConversationId>,
}

/// Score every option available to `agent`.
///
/// `neighbors` must already be filtered to free agents within the social
/// radius.
pub fn score_options<R: Rng + ?Sized>(
    agent: &Agent,
    neighbors: &[Neighbor],
    now: SimTime,
    config: &TownConfig,
    scorer: &dyn PersonalityScorer,
    rng: &mut R,
) -> Vec<DecisionOption> {
    let cfg = &config.decision;
    let top_goal = agent.goals.first();
    let mut options = Vec::with_capacity(4);

    // Socialize
    let nearest = neighbors
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance));
    if let Some(nearest) = nearest {
        let mut affinity = scorer.social_affinity(&agent.identity);
        let window = Duration::from_millis(cfg.recent_conversation_window_ms);
        if agent.conversed_within(now, window) {
            affinity *= cfg.recent_conversation_penalty;
        }
        let mut priority = affinity * cfg.social_weight;
        let mut target = nearest.id;
        let mut goal = None;

        if let Some(wanted) = agent.talk_goal_target() {
            if let Some(n) = neighbors.iter().find(|n| n.name.eq_ignore_ascii_case(wanted)) {
                target = n.id;
                priority += cfg.goal_bonus;
                goal = top_goal.cloned();
            }
        }

        options.push(DecisionOption {
            kind: DecisionKind::Socialize,
            priority,
            target: Some(DecisionTarget::Agent(target)),
            label: None,
            goal,
        });
    }

    // Explore
    {
        let mut priority = scorer.exploration_affinity(&agent.identity) * cfg.explore_weight;
        let mut goal = None;
        let goal_poi = top_goal.and_then(|g| {
            let g = g.to_lowercase();
            config
                .world
                .points_of_interest
                .iter()
                .find(|poi| g.contains(&poi.name.to_lowercase()))
        });

        let (destination, label) = if let Some(poi) = goal_poi {
            priority += cfg.goal_bonus;
            goal = top_goal.cloned();
            (jitter(poi.position(), cfg, &config.world, rng), Some(poi.name.clone()))
        } else {
            if top_goal.is_some_and(|g| g.to_lowercase().contains("explore")) {
                priority += cfg.goal_bonus;
                goal = top_goal.cloned();
            }
            pick_destination(&config.world, cfg, rng)
        };

        options.push(DecisionOption {
            kind: DecisionKind::Explore,
            priority,
            target: Some(DecisionTarget::Location(destination)),
            label,
            goal,
        });
    }

    // Return home
    if !agent.memories.is_empty() {
        options.push(DecisionOption {
            kind: DecisionKind::ReturnHome,
            priority: cfg.return_home_priority,
            target: Some(DecisionTarget::Location(
                agent.home_position(config.world.width, config.world.height),
            )),
            label: Some("home".to_string()),
            goal: None,
        });
    }

    // Idle
    options.push(DecisionOption {
        kind: DecisionKind::Idle,
        priority: cfg.idle_priority,
        target: None,
        label: None,
        goal: None,
    });

    options
}

/// Pick an option index by squared-priority weighted draw.
///
/// Returns `None` only for an empty slice. If every weight is zero the
/// first option is returned.
pub fn choose_weighted<R: Rng + ?Sized>(options: &[DecisionOption], rng: &mut R) -> Option<usize> {
    if options.is_empty() {
        return None;
    }
    let weights: Vec<f32> = options.iter().map(|o| o.priority.max(0.0).powi(2)).collect();
    let total: f32 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(0);
    }

    let mut draw = rng.gen_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if draw < *w {
            return Some(i);
        }
        draw -= w;
    }
    // Float rounding can leave a sliver past the last weight.
    Some(weights.iter().rposition(|w| *w > 0.0).unwrap_or(0))
}

/// Choose an exploration destination: usually a jittered point of
/// interest, occasionally a uniform-random point.
pub fn pick_destination<R: Rng + ?Sized>(
    world: &WorldConfig,
    cfg: &DecisionConfig,
    rng: &mut R,
) -> (Position, Option<String>) {
    let random_point = world.points_of_interest.is_empty()
        || rng.gen_bool(f64::from(cfg.random_destination_chance));
    if random_point {
        let p = Position::new(rng.gen_range(0.0..=world.width), rng.gen_range(0.0..=world.height));
        return (p, None);
    }

    match world.points_of_interest.choose(rng) {
        Some(poi) => (jitter(poi.position(), cfg, world, rng), Some(poi.name.clone())),
        None => (Position::new(world.width / 2.0, world.height / 2.0), None),
    }
}

fn jitter<R: Rng + ?Sized>(p: Position, cfg: &DecisionConfig, world: &WorldConfig, rng: &mut R) -> Position {
    let j = cfg.destination_jitter.max(0.0);
    if j == 0.0 {
        return p.clamped(world.width, world.height);
    }
    p.offset(rng.gen_range(-j..=j), rng.gen_range(-j..=j))
        .clamped(world.width, world.height)
}
