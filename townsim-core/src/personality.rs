//! Personality scoring: how much an agent wants to socialize or explore.
//!
//! The default [`KeywordScorer`] scans the free-text identity for a handful
//! of words. It is intentionally crude; anything implementing
//! [`PersonalityScorer`] can replace it on the world.

/// Maps an agent's identity text to behavioral affinities in `[0, 1]`.
pub trait PersonalityScorer: Send + Sync {
    /// How strongly the agent seeks out conversation.
    fn social_affinity(&self, identity: &str) -> f32;

    /// How strongly the agent wants to wander to new places.
    fn exploration_affinity(&self, identity: &str) -> f32;
}

/// Keyword-scan scorer.
///
/// Starts from a neutral baseline, raises the score for each matching
/// positive keyword and lowers it for each negative one.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    /// Score with no keyword hits.
    pub baseline: f32,
    /// Added per positive keyword found.
    pub boost: f32,
    /// Subtracted per negative keyword found.
    pub penalty: f32,
    /// Words that raise social affinity.
    pub social_positive: Vec<&'static str>,
    /// Words that lower social affinity.
    pub social_negative: Vec<&'static str>,
    /// Words that raise exploration affinity.
    pub explore_positive: Vec<&'static str>,
    /// Words that lower exploration affinity.
    pub explore_negative: Vec<&'static str>,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self {
            baseline: 0.5,
            boost: 0.15,
            penalty: 0.2,
            social_positive: vec!["friendly", "social", "outgoing", "chat", "talkative", "sociable"],
            social_negative: vec!["shy", "quiet", "reserved", "keeps to herself", "keeps to himself", "loner"],
            explore_positive: vec!["curious", "explorer", "adventur", "wander", "travel"],
            explore_negative: vec!["homebody", "cautious", "stays home", "settled"],
        }
    }
}

impl KeywordScorer {
    fn score(&self, identity: &str, positive: &[&str], negative: &[&str]) -> f32 {
        let text = identity.to_lowercase();
        let hits = |words: &[&str]| words.iter().filter(|w| text.contains(**w)).count() as f32;
        (self.baseline + hits(positive) * self.boost - hits(negative) * self.penalty).clamp(0.05, 1.0)
    }
}

impl PersonalityScorer for KeywordScorer {
    fn social_affinity(&self, identity: &str) -> f32 {
        self.score(identity, &self.social_positive, &self.social_negative)
    }

    fn exploration_affinity(&self, identity: &str) -> f32 {
        self.score(identity, &self.explore_positive, &self.explore_negative)
    }
}
