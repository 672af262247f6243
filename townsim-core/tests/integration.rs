//! Integration Tests: End-to-End Town Flows
//!
//! Drive a [`SimulationWorld`] through whole scenarios with an explicit
//! clock: conversation lifecycles, user messages, goal injection, forced
//! conversations and termination.

use std::time::Duration;

use townsim_core::conversation::Phase;
use townsim_core::{
    Activity, Archetype, ForceTalk, Position, SimTime, SimulationWorld, TownConfig, TurnFollowUp,
    clean_response,
};

fn config() -> TownConfig {
    let mut config = TownConfig::default();
    config.general.seed = Some(2024);
    config.decision.evaluation_probability = 0.0;
    config.conversation.proximity_cooldown_ms = 600_000;
    config
}

/// Play every scheduled turn of a conversation with canned lines,
/// returning the time the conversation ended.
fn play_out(world: &mut SimulationWorld, conv: townsim_core::ConversationId, mut now: SimTime) -> SimTime {
    let mut speaker = world.conversation(conv).expect("active").participants[0];
    let mut phase = Phase::Start;
    loop {
        let ctx = world.turn_context(conv, speaker, phase).expect("context");
        let line = world.fallback_line(&ctx);
        let line = clean_response(&line, &ctx.speaker_name, &ctx.listener_name, ctx.max_chars);
        match world.record_message(conv, speaker, &line, now).expect("record") {
            TurnFollowUp::Reply { next_speaker, delay } => {
                speaker = next_speaker;
                phase = Phase::Continue;
                now = now.after(delay);
            }
            TurnFollowUp::Ended(_) => return now,
            TurnFollowUp::AwaitUser => panic!("no user in this conversation"),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation lifecycle: proximity → six messages → both freed
// ---------------------------------------------------------------------------

#[test]
fn conversation_lifecycle() {
    let mut cfg = config();
    cfg.conversation.trigger_probability = 1.0;
    let mut world = SimulationWorld::new(cfg).expect("valid config");
    let a = world.spawn_npc("Rosa", "friendly", Archetype::Baker, Position::new(200.0, 200.0), &[]);
    let b = world.spawn_npc("Tobias", "shy", Archetype::Scholar, Position::new(210.0, 200.0), &[]);

    let report = world.tick(SimTime::from_secs(1));
    assert_eq!(report.started.len(), 1);
    let conv = report.started[0];
    let ca = world.agent(a).and_then(|x| x.current_conversation);
    let cb = world.agent(b).and_then(|x| x.current_conversation);
    assert_eq!(ca, Some(conv));
    assert_eq!(ca, cb);

    let ended = play_out(&mut world, conv, SimTime::from_secs(1));
    assert!(ended.since(SimTime::from_secs(1)) <= Duration::from_secs(25));

    assert!(world.conversation(conv).is_none());
    assert!(world.agent(a).is_some_and(|x| x.current_conversation.is_none()));
    assert!(world.agent(b).is_some_and(|x| x.current_conversation.is_none()));
    assert!(world.agent(a).is_some_and(|x| x.memories.iter().any(|m| m == "Talked with Tobias")));
    world.verify_invariants().expect("consistent");
}

// ---------------------------------------------------------------------------
// Termination guarantee: a silent conversation times out
// ---------------------------------------------------------------------------

#[test]
fn silent_conversation_times_out() {
    let mut world = SimulationWorld::new(config()).expect("valid config");
    let a = world.spawn_npc("Greta", "", Archetype::Merchant, Position::new(100.0, 100.0), &[]);
    let b = world.spawn_npc("Finn", "", Archetype::Wanderer, Position::new(120.0, 100.0), &[]);
    let conv = world.start_conversation(a, b, SimTime::ZERO).expect("start");

    let mut now = SimTime::ZERO;
    while world.is_active(conv) {
        now = now.after(Duration::from_secs(1));
        world.tick(now);
        assert!(now <= SimTime::from_secs(62), "conversation outlived its maximum duration");
    }
    assert!(now > SimTime::from_secs(60));
}

// ---------------------------------------------------------------------------
// Direct user message
// ---------------------------------------------------------------------------

#[test]
fn direct_user_message_flow() {
    let mut world = SimulationWorld::new(config()).expect("valid config");
    let npc = world.spawn_npc("Rosa", "friendly", Archetype::Baker, Position::new(300.0, 300.0), &[]);
    let user = world.spawn_user_agent("Player", Position::new(350.0, 300.0));

    let (conv, follow) = world
        .send_user_message(user, npc, "hello", SimTime::ZERO)
        .expect("in range");
    let c = world.conversation(conv).expect("conversation");
    assert_eq!(c.messages.len(), 1);
    assert_eq!(c.messages[0].speaker, user);
    assert_eq!(c.messages[0].text, "hello");

    let TurnFollowUp::Reply { next_speaker, delay } = follow else {
        panic!("the NPC should be asked to reply");
    };
    assert_eq!(next_speaker, npc);

    let ctx = world.turn_context(conv, npc, Phase::Continue).expect("context");
    assert_eq!(ctx.phase, Phase::Continue);
    assert_eq!(ctx.history_lines(), "Player: hello");
    let reply = world.fallback_line(&ctx);
    let next = world
        .record_message(conv, npc, &reply, SimTime::ZERO.after(delay))
        .expect("reply");
    assert_eq!(next, TurnFollowUp::AwaitUser);
}

// ---------------------------------------------------------------------------
// Goal injection
// ---------------------------------------------------------------------------

#[test]
fn goal_injection_on_idle_npc() {
    let mut world = SimulationWorld::new(config()).expect("valid config");
    let ids = world.seed_default_cast();
    let finn = ids[3];

    let decision = world
        .give_goal(finn, "explore forest", SimTime::from_secs(1))
        .expect("goal accepted");
    let agent = world.agent(finn).expect("finn");
    assert_eq!(agent.goals[0], "explore forest");
    assert!(decision.is_some());
    world.verify_invariants().expect("consistent");
}

// ---------------------------------------------------------------------------
// Forced conversation across the map
// ---------------------------------------------------------------------------

#[test]
fn forced_talk_walks_over_and_starts_on_arrival() {
    let mut cfg = config();
    cfg.conversation.trigger_probability = 0.0;
    let mut world = SimulationWorld::new(cfg).expect("valid config");
    let a = world.spawn_npc("Rosa", "", Archetype::Baker, Position::new(100.0, 100.0), &[]);
    let b = world.spawn_npc("Mabel", "", Archetype::Recluse, Position::new(600.0, 450.0), &[]);

    let ForceTalk::Approaching { .. } = world.force_talk(a, b, SimTime::ZERO).expect("force") else {
        panic!("they start far apart");
    };

    let mut now = SimTime::ZERO;
    let mut started = None;
    for _ in 0..60 {
        now = now.after(Duration::from_secs(1));
        let report = world.tick(now);
        if let Some(conv) = report.started.first() {
            started = Some(*conv);
            break;
        }
    }
    let conv = started.expect("conversation on arrival");
    assert_eq!(world.agent(b).and_then(|x| x.current_conversation), Some(conv));
    assert!(world.agent(a).is_some_and(|x| !x.goals.iter().any(|g| g == "talk to Mabel")));
}

// ---------------------------------------------------------------------------
// A busy town stays consistent
// ---------------------------------------------------------------------------

#[test]
fn busy_town_keeps_invariants() {
    let mut cfg = TownConfig::default();
    cfg.general.seed = Some(99);
    cfg.conversation.trigger_probability = 0.8;
    cfg.decision.evaluation_probability = 0.5;
    let mut world = SimulationWorld::new(cfg).expect("valid config");
    world.seed_default_cast();
    for i in 0..5 {
        world.create_custom_npc(&format!("Guest {i}"), "a sociable friendly guest", None, None);
    }

    let mut now = SimTime::ZERO;
    for _ in 0..300 {
        now = now.after(Duration::from_secs(1));
        let report = world.tick(now);
        // Answer every opening so conversations also end by cap.
        for conv in report.started {
            let speaker = world.conversation(conv).expect("fresh").participants[0];
            let ctx = world.turn_context(conv, speaker, Phase::Start).expect("context");
            let line = world.fallback_line(&ctx);
            world.record_message(conv, speaker, &line, now).expect("record");
        }
        world.verify_invariants().expect("consistent every tick");
    }

    let statuses = world.npc_statuses(now);
    assert_eq!(statuses.len(), 10);
    assert!(statuses.iter().any(|s| s.activity != Activity::Idle || !s.recent_memories.is_empty()));
}
