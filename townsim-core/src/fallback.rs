//! Fallback dialogue table: canned lines used whenever text generation is
//! unavailable or fails.
//!
//! Lines are keyed by [`Archetype`] and [`Phase`]. A `{name}` placeholder is
//! replaced by the listener's name. Archetypes without an entry (notably
//! [`Archetype::Custom`]) get the generic lines.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::archetype::Archetype;
use crate::conversation::Phase;

/// Generic opening used for unknown archetypes.
pub const GENERIC_GREETING: &str = "Hello, {name}!";
/// Generic continuation used for unknown archetypes.
pub const GENERIC_CONTINUE: &str = "That's interesting.";
/// Generic farewell used for unknown archetypes.
pub const GENERIC_LEAVE: &str = "Well, I should get going. See you around!";

/// Canned lines for one archetype, one list per phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseLines {
    /// Opening lines.
    pub start: Vec<&'static str>,
    /// Continuation lines.
    pub continuing: Vec<&'static str>,
    /// Closing lines.
    pub leave: Vec<&'static str>,
}

impl PhaseLines {
    fn for_phase(&self, phase: Phase) -> &[&'static str] {
        match phase {
            Phase::Start => &self.start,
            Phase::Continue => &self.continuing,
            Phase::Leave => &self.leave,
        }
    }
}

/// Archetype → phase → lines mapping.
#[derive(Debug, Clone)]
pub struct DialogueTable {
    entries: HashMap<Archetype, PhaseLines>,
}

impl DialogueTable {
    /// An empty table; every lookup yields the generic lines.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The built-in table covering every scripted archetype.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();

        entries.insert(Archetype::Baker, PhaseLines {
            start: vec![
                "Good morning, {name}! The bread just came out of the oven.",
                "{name}! Come here, you have to try these cinnamon rolls.",
                "Oh, hello {name}! Lovely day for a stroll, isn't it?",
            ],
            continuing: vec![
                "I always say a warm loaf fixes most problems.",
                "You should come by the bakery later, I'm trying a new recipe.",
                "Half the town stopped by today. Everyone has a story!",
            ],
            leave: vec![
                "I'd better get back before the ovens burn. Take care, {name}!",
                "Come by for a pastry soon!",
            ],
        });

        entries.insert(Archetype::Scholar, PhaseLines {
            start: vec![
                "Ah, {name}. I was just reading about the founding of this town.",
                "Hello, {name}. Have you read anything interesting lately?",
            ],
            continuing: vec![
                "Fascinating. That reminds me of something in the old almanac.",
                "I'd like to look into that further.",
                "The library has a whole shelf on that, you know.",
            ],
            leave: vec![
                "I should return to my books. Good talking with you, {name}.",
                "Excuse me, I have a chapter to finish.",
            ],
        });

        entries.insert(Archetype::Merchant, PhaseLines {
            start: vec![
                "{name}! Just the person I wanted to see. Have I got a deal for you.",
                "Well met, {name}. Business has been brisk today!",
            ],
            continuing: vec![
                "Spices from the coast, finest you'll find. Special price for a friend.",
                "Everything has a price, but friendship comes with a discount.",
                "Did you hear what the caravans are saying about the roads?",
            ],
            leave: vec![
                "Customers are waiting. Remember, best prices in town!",
                "I must see to my stall. Until next time, {name}.",
            ],
        });

        entries.insert(Archetype::Wanderer, PhaseLines {
            start: vec![
                "Hey {name}! Do you know what's past the old well?",
                "Hi {name}! I'm still finding my way around this place.",
            ],
            continuing: vec![
                "I walked through the park earlier. There's so much to see here.",
                "Where I come from, the towns are nothing like this.",
                "I want to visit every corner of this town before the season ends.",
            ],
            leave: vec![
                "I'm off to explore some more. See you, {name}!",
                "The road is calling. Catch you later!",
            ],
        });

        entries.insert(Archetype::Recluse, PhaseLines {
            start: vec![
                "Oh. Hello, {name}.",
                "Mm. Good day, {name}.",
            ],
            continuing: vec![
                "I suppose so.",
                "My tomatoes are coming along, if you must know.",
                "It's been quiet. I like it quiet.",
            ],
            leave: vec![
                "I should get home now.",
                "Goodbye, {name}.",
            ],
        });

        Self { entries }
    }

    /// Whether the archetype has its own (non-generic) lines.
    #[must_use]
    pub fn has_entry(&self, archetype: Archetype) -> bool {
        self.entries.contains_key(&archetype)
    }

    /// Pick a line uniformly at random for the archetype and phase, with
    /// `{name}` replaced by `listener_name`.
    pub fn line<R: Rng + ?Sized>(
        &self,
        archetype: Archetype,
        phase: Phase,
        listener_name: &str,
        rng: &mut R,
    ) -> String {
        let template = self
            .entries
            .get(&archetype)
            .and_then(|lines| lines.for_phase(phase).choose(rng).copied())
            .unwrap_or(match phase {
                Phase::Start => GENERIC_GREETING,
                Phase::Continue => GENERIC_CONTINUE,
                Phase::Leave => GENERIC_LEAVE,
            });

        template.replace("{name}", listener_name)
    }
}

impl Default for DialogueTable {
    fn default() -> Self {
        Self::builtin()
    }
}
