//! Configuration for the town simulation.
//!
//! Maps directly to `townsim.toml`. Every field has a default, so an empty
//! document is a valid configuration and any subset of keys may be given.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TownError};
use crate::types::Position;

/// Top-level townsim configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TownConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Movement tuning.
    #[serde(default)]
    pub movement: MovementConfig,
    /// Conversation triggers, limits and pacing.
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Decision engine tuning.
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Per-agent memory and goal limits.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Map geometry and points of interest.
    #[serde(default)]
    pub world: WorldConfig,
    /// Text generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl TownConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `TownError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| TownError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values the simulation cannot run with.
    ///
    /// # Errors
    /// Returns `TownError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        fn probability(name: &str, p: f32) -> Result<()> {
            if (0.0..=1.0).contains(&p) {
                Ok(())
            } else {
                Err(TownError::Config(format!("{name} must be within [0, 1], got {p}")))
            }
        }

        if self.general.tick_interval_ms == 0 {
            return Err(TownError::Config("general.tick_interval_ms must be > 0".into()));
        }
        if self.movement.speed <= 0.0 {
            return Err(TownError::Config("movement.speed must be > 0".into()));
        }
        if self.movement.arrival_threshold <= 0.0 {
            return Err(TownError::Config("movement.arrival_threshold must be > 0".into()));
        }
        probability("conversation.trigger_probability", self.conversation.trigger_probability)?;
        probability("decision.evaluation_probability", self.decision.evaluation_probability)?;
        probability("decision.random_destination_chance", self.decision.random_destination_chance)?;
        if self.conversation.max_messages == 0 {
            return Err(TownError::Config("conversation.max_messages must be > 0".into()));
        }
        if self.conversation.reply_delay_min_ms > self.conversation.reply_delay_max_ms {
            return Err(TownError::Config(
                "conversation.reply_delay_min_ms exceeds reply_delay_max_ms".into(),
            ));
        }
        if self.conversation.max_chars < 2 {
            return Err(TownError::Config("conversation.max_chars must be >= 2".into()));
        }
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            return Err(TownError::Config("world dimensions must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Fixed tick period in milliseconds.
    #[serde(default = "default_1000")]
    pub tick_interval_ms: u64,
    /// RNG seed. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_interval_ms: 1000,
            seed: None,
        }
    }
}

/// Straight-line movement tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Distance covered per tick.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Below this distance an agent counts as arrived.
    #[serde(default = "default_arrival")]
    pub arrival_threshold: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            arrival_threshold: 5.0,
        }
    }
}

/// Conversation triggering, limits and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Free agents closer than this may spontaneously start talking.
    #[serde(default = "default_80")]
    pub trigger_distance: f32,
    /// Chance per tick that an eligible pair starts a conversation.
    #[serde(default = "default_0_6")]
    pub trigger_probability: f32,
    /// Max distance for a user-controlled agent to address someone directly.
    #[serde(default = "default_120")]
    pub direct_message_distance: f32,
    /// A conversation ends once it holds this many messages.
    #[serde(default = "default_6")]
    pub max_messages: usize,
    /// A conversation ends once it has run this long.
    #[serde(default = "default_60000")]
    pub max_duration_ms: u64,
    /// Minimum delay before the other participant replies.
    #[serde(default = "default_2000")]
    pub reply_delay_min_ms: u64,
    /// Maximum delay before the other participant replies.
    #[serde(default = "default_5000")]
    pub reply_delay_max_ms: u64,
    /// How many recent messages are embedded in a prompt.
    #[serde(default = "default_4")]
    pub history_window: usize,
    /// Hard cap on the length of one utterance, in characters.
    #[serde(default = "default_200")]
    pub max_chars: usize,
    /// Token budget for an opening line.
    #[serde(default = "default_60")]
    pub start_max_tokens: u32,
    /// Token budget for a continuation.
    #[serde(default = "default_60")]
    pub continue_max_tokens: u32,
    /// Token budget for a closing line.
    #[serde(default = "default_30")]
    pub leave_max_tokens: u32,
    /// How long a spoken line stays visible above an agent.
    #[serde(default = "default_10000")]
    pub message_ttl_ms: u64,
    /// An agent that just finished a conversation is not pulled into a new
    /// proximity-triggered one for this long. Without it a pair that parts
    /// while still standing side by side re-pairs on the next tick. Forced,
    /// goal-driven and user conversations ignore it. `0` disables it.
    #[serde(default = "default_15000")]
    pub proximity_cooldown_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            trigger_distance: 80.0,
            trigger_probability: 0.6,
            direct_message_distance: 120.0,
            max_messages: 6,
            max_duration_ms: 60_000,
            reply_delay_min_ms: 2000,
            reply_delay_max_ms: 5000,
            history_window: 4,
            max_chars: 200,
            start_max_tokens: 60,
            continue_max_tokens: 60,
            leave_max_tokens: 30,
            message_ttl_ms: 10_000,
            proximity_cooldown_ms: 15_000,
        }
    }
}

/// Decision engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Chance per tick that a free NPC re-evaluates what to do.
    #[serde(default = "default_0_18")]
    pub evaluation_probability: f32,
    /// Radius in which other free agents count as socialization candidates.
    #[serde(default = "default_social_radius")]
    pub social_radius: f32,
    /// Multiplier on the social affinity score.
    #[serde(default = "default_1_0")]
    pub social_weight: f32,
    /// Multiplier on the exploration affinity score.
    #[serde(default = "default_0_8")]
    pub explore_weight: f32,
    /// Fixed priority of returning home.
    #[serde(default = "default_0_3")]
    pub return_home_priority: f32,
    /// Fixed priority of idling.
    #[serde(default = "default_0_2")]
    pub idle_priority: f32,
    /// Bonus added to an option that serves the agent's top goal.
    #[serde(default = "default_0_5")]
    pub goal_bonus: f32,
    /// A conversation ending within this window counts as "recent".
    #[serde(default = "default_30000")]
    pub recent_conversation_window_ms: u64,
    /// Social affinity multiplier applied after a recent conversation.
    #[serde(default = "default_0_5")]
    pub recent_conversation_penalty: f32,
    /// Chance that exploration picks a uniform-random point instead of a
    /// point of interest.
    #[serde(default = "default_0_2")]
    pub random_destination_chance: f32,
    /// Max random offset applied to a chosen destination on each axis.
    #[serde(default = "default_40")]
    pub destination_jitter: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            evaluation_probability: 0.18,
            social_radius: 200.0,
            social_weight: 1.0,
            explore_weight: 0.8,
            return_home_priority: 0.3,
            idle_priority: 0.2,
            goal_bonus: 0.5,
            recent_conversation_window_ms: 30_000,
            recent_conversation_penalty: 0.5,
            random_destination_chance: 0.2,
            destination_jitter: 40.0,
        }
    }
}

/// Per-agent recency buffer and goal list limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Max memory notes per agent; the oldest is evicted first.
    #[serde(default = "default_10")]
    pub max_memories: usize,
    /// Max goals per agent; the least urgent is dropped first.
    #[serde(default = "default_5")]
    pub max_goals: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories: 10,
            max_goals: 5,
        }
    }
}

/// A named destination on the map that exploration is biased towards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Display name, also matched against goal text.
    pub name: String,
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl PointOfInterest {
    /// Create a named point of interest.
    #[must_use]
    pub fn new(name: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }

    /// The point's map position.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Map geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Map width in world units.
    #[serde(default = "default_width")]
    pub width: f32,
    /// Map height in world units.
    #[serde(default = "default_height")]
    pub height: f32,
    /// Named destinations.
    #[serde(default = "default_points_of_interest")]
    pub points_of_interest: Vec<PointOfInterest>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            points_of_interest: default_points_of_interest(),
        }
    }
}

/// Text generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL for the backend API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key for OpenAI-compatible backends.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier loaded at initialization.
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard timeout for one generation call in milliseconds.
    #[serde(default = "default_20000")]
    pub request_timeout_ms: u64,
    /// Retries inside one generation call before giving up.
    #[serde(default = "default_1_u32")]
    pub max_retries: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_8")]
    pub temperature: f32,
    /// Optional TOML file overriding the built-in prompt templates.
    #[serde(default)]
    pub prompt_file: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "qwen2.5:0.5b".to_string(),
            request_timeout_ms: 20_000,
            max_retries: 1,
            temperature: 0.8,
            prompt_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String { "info".to_string() }
fn default_provider() -> String { "none".to_string() }
fn default_base_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "qwen2.5:0.5b".to_string() }
fn default_points_of_interest() -> Vec<PointOfInterest> {
    vec![
        PointOfInterest::new("town square", 400.0, 300.0),
        PointOfInterest::new("bakery", 160.0, 120.0),
        PointOfInterest::new("library", 640.0, 120.0),
        PointOfInterest::new("market", 200.0, 460.0),
        PointOfInterest::new("park", 620.0, 470.0),
        PointOfInterest::new("well", 420.0, 180.0),
    ]
}
fn default_0_2() -> f32 { 0.2 }
fn default_0_3() -> f32 { 0.3 }
fn default_0_5() -> f32 { 0.5 }
fn default_0_6() -> f32 { 0.6 }
fn default_0_8() -> f32 { 0.8 }
fn default_0_18() -> f32 { 0.18 }
fn default_1_0() -> f32 { 1.0 }
fn default_speed() -> f32 { 20.0 }
fn default_arrival() -> f32 { 5.0 }
fn default_40() -> f32 { 40.0 }
fn default_80() -> f32 { 80.0 }
fn default_120() -> f32 { 120.0 }
fn default_social_radius() -> f32 { 200.0 }
fn default_width() -> f32 { 800.0 }
fn default_height() -> f32 { 600.0 }
fn default_1_u32() -> u32 { 1 }
fn default_30() -> u32 { 30 }
fn default_60() -> u32 { 60 }
fn default_4() -> usize { 4 }
fn default_5() -> usize { 5 }
fn default_6() -> usize { 6 }
fn default_10() -> usize { 10 }
fn default_200() -> usize { 200 }
fn default_1000() -> u64 { 1000 }
fn default_2000() -> u64 { 2000 }
fn default_5000() -> u64 { 5000 }
fn default_10000() -> u64 { 10_000 }
fn default_15000() -> u64 { 15_000 }
fn default_20000() -> u64 { 20_000 }
fn default_30000() -> u64 { 30_000 }
fn default_60000() -> u64 { 60_000 }
