//! Straight-line movement and proximity queries.
//!
//! Algorithm, per tick, per moving agent:
//! 1. Compute the vector to the target
//! 2. Closer than the arrival threshold → snap onto the target, stop
//! 3. Otherwise advance by `speed` along the normalized direction,
//!    never past the target
//!
//! No acceleration, no collision, no pathfinding.

use crate::agent::Agent;
use crate::config::MovementConfig;
use crate::types::Position;

/// Result of advancing one agent by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Agent has no target; nothing happened.
    Stationary,
    /// Agent moved and still has `remaining` distance to go.
    Advanced {
        /// Distance left to the target after this step.
        remaining: f32,
    },
    /// Agent reached its target this tick.
    Arrived,
}

/// Move `from` towards `to` by at most `speed`.
///
/// The step is clamped to the remaining distance so the walker lands on the
/// target instead of overshooting it.
#[must_use]
pub fn step_towards(from: Position, to: Position, speed: f32) -> Position {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= f32::EPSILON {
        return to;
    }
    let step = speed.min(dist);
    Position::new(from.x + dx / dist * step, from.y + dy / dist * step)
}

/// Advance one agent by one tick.
pub fn advance(agent: &mut Agent, config: &MovementConfig) -> StepOutcome {
    let Some(target) = agent.target_position.filter(|_| agent.is_moving) else {
        return StepOutcome::Stationary;
    };

    if agent.position.distance_to(&target) < config.arrival_threshold {
        agent.position = target;
        agent.target_position = None;
        agent.is_moving = false;
        return StepOutcome::Arrived;
    }

    agent.position = step_towards(agent.position, target, config.speed);
    StepOutcome::Advanced {
        remaining: agent.position.distance_to(&target),
    }
}

/// Upper bound on ticks needed to arrive from `distance` away.
#[must_use]
pub fn ticks_to_arrive(distance: f32, config: &MovementConfig) -> u32 {
    // One tick per full step, one for the final snap.
    (distance / config.speed).ceil() as u32 + 1
}

/// The point `standoff` units short of `target` on the line from `from`.
///
/// Used to walk up to someone without standing on top of them.
#[must_use]
pub fn standoff_point(from: Position, target: Position, standoff: f32) -> Position {
    let dist = from.distance_to(&target);
    if dist <= standoff {
        return from;
    }
    step_towards(from, target, dist - standoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::types::AgentId;

    fn walker(from: Position, to: Position) -> Agent {
        let mut a = Agent::npc(AgentId(1), "Finn", "", Archetype::Wanderer, from);
        a.set_destination(to);
        a
    }

    #[test]
    fn step_moves_by_speed() {
        let p = step_towards(Position::new(0.0, 0.0), Position::new(100.0, 0.0), 20.0);
        assert!((p.x - 20.0).abs() < 1e-4);
        assert!(p.y.abs() < 1e-4);
    }

    #[test]
    fn step_never_overshoots() {
        let p = step_towards(Position::new(0.0, 0.0), Position::new(7.0, 0.0), 20.0);
        assert_eq!(p, Position::new(7.0, 0.0));
    }

    #[test]
    fn agent_arrives_and_stops() {
        let config = MovementConfig::default();
        let mut a = walker(Position::new(0.0, 0.0), Position::new(50.0, 0.0));
        let mut ticks = 0;
        loop {
            ticks += 1;
            if advance(&mut a, &config) == StepOutcome::Arrived {
                break;
            }
            assert!(ticks < 100, "never arrived");
        }
        assert!(!a.is_moving);
        assert!(a.target_position.is_none());
        assert_eq!(a.position, Position::new(50.0, 0.0));
        assert!(ticks <= ticks_to_arrive(50.0, &config));
    }

    #[test]
    fn stationary_agent_is_untouched() {
        let config = MovementConfig::default();
        let mut a = Agent::npc(AgentId(1), "Mabel", "", Archetype::Recluse, Position::new(5.0, 5.0));
        assert_eq!(advance(&mut a, &config), StepOutcome::Stationary);
        assert_eq!(a.position, Position::new(5.0, 5.0));
    }

    #[test]
    fn standoff_stops_short() {
        let p = standoff_point(Position::new(0.0, 0.0), Position::new(100.0, 0.0), 30.0);
        assert!((p.x - 70.0).abs() < 1e-3);
        let near = standoff_point(Position::new(90.0, 0.0), Position::new(100.0, 0.0), 30.0);
        assert_eq!(near, Position::new(90.0, 0.0));
    }
}
