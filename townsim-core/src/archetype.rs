//! Character archetypes and the default town cast.
//!
//! An archetype selects an agent's canned fallback dialogue. It is a tag on
//! the agent, independent of its id or name, so renamed or custom characters
//! still resolve to a table entry (or to [`Archetype::Custom`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named personality category used to select fallback dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// Warm, chatty shopkeeper.
    Baker,
    /// Bookish and curious.
    Scholar,
    /// Deal-minded and sociable.
    Merchant,
    /// Restless traveller.
    Wanderer,
    /// Quiet homebody.
    Recluse,
    /// User-created or unknown character; uses generic lines.
    Custom,
}

impl Archetype {
    /// All archetypes that have a dedicated dialogue table.
    pub const SCRIPTED: [Archetype; 5] = [
        Archetype::Baker,
        Archetype::Scholar,
        Archetype::Merchant,
        Archetype::Wanderer,
        Archetype::Recluse,
    ];

    /// Stable lowercase key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Baker => "baker",
            Self::Scholar => "scholar",
            Self::Merchant => "merchant",
            Self::Wanderer => "wanderer",
            Self::Recluse => "recluse",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baker" => Ok(Self::Baker),
            "scholar" => Ok(Self::Scholar),
            "merchant" => Ok(Self::Merchant),
            "wanderer" => Ok(Self::Wanderer),
            "recluse" => Ok(Self::Recluse),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("unknown archetype: '{s}'")),
        }
    }
}

/// One member of the fixed starting cast.
#[derive(Debug, Clone)]
pub struct CastMember {
    /// Display name.
    pub name: &'static str,
    /// Free-text personality description.
    pub identity: &'static str,
    /// Dialogue archetype.
    pub archetype: Archetype,
    /// Initial goals, most urgent first.
    pub goals: &'static [&'static str],
    /// Starting position.
    pub x: f32,
    /// Starting position.
    pub y: f32,
}

/// The five NPCs every fresh town starts with.
#[must_use]
pub fn default_cast() -> Vec<CastMember> {
    vec![
        CastMember {
            name: "Rosa",
            identity: "Rosa runs the bakery. She is friendly, outgoing and loves to chat with every customer.",
            archetype: Archetype::Baker,
            goals: &["sell the morning bread", "catch up on town news"],
            x: 170.0,
            y: 140.0,
        },
        CastMember {
            name: "Tobias",
            identity: "Tobias is the town librarian, curious about everything but a little shy around crowds.",
            archetype: Archetype::Scholar,
            goals: &["finish cataloguing the new books", "find someone who has read the old almanac"],
            x: 620.0,
            y: 140.0,
        },
        CastMember {
            name: "Greta",
            identity: "Greta is a sociable merchant who always has a deal in mind and a story to tell.",
            archetype: Archetype::Merchant,
            goals: &["find buyers for imported spices"],
            x: 220.0,
            y: 440.0,
        },
        CastMember {
            name: "Finn",
            identity: "Finn is a curious explorer who has just arrived in town and wants to see every corner of it.",
            archetype: Archetype::Wanderer,
            goals: &["explore the park", "meet the locals"],
            x: 400.0,
            y: 320.0,
        },
        CastMember {
            name: "Mabel",
            identity: "Mabel is a quiet, cautious homebody who tends her garden and keeps to herself.",
            archetype: Archetype::Recluse,
            goals: &["water the garden"],
            x: 600.0,
            y: 450.0,
        },
    ]
}
