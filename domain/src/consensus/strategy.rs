//! Voting strategies for vote recommendations
//!
//! A strategy is a named policy that shapes the *advice* given to an agent
//! asked how to vote. It never decides consensus: the proposal's own
//! `required_threshold` is the only binding gate. The two are kept separate
//! on purpose.

use serde::{Deserialize, Serialize};

/// Named recommendation policy
///
/// # Example
///
/// ```
/// use hivemind_domain::VotingStrategy;
///
/// assert_eq!(VotingStrategy::for_threshold(0.9), VotingStrategy::Supermajority);
/// assert_eq!(VotingStrategy::for_threshold(1.0), VotingStrategy::Unanimous);
/// assert_eq!(VotingStrategy::for_threshold(0.5), VotingStrategy::SimpleMajority);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VotingStrategy {
    /// More than half should approve
    #[default]
    SimpleMajority,
    /// Two thirds should approve
    Supermajority,
    /// Everyone should approve
    Unanimous,
    /// Sixty percent should approve
    QualifiedMajority,
}

impl VotingStrategy {
    /// The approval fraction this policy aims for
    pub fn threshold(&self) -> f64 {
        match self {
            VotingStrategy::SimpleMajority => 0.5,
            VotingStrategy::Supermajority => 0.66,
            VotingStrategy::Unanimous => 1.0,
            VotingStrategy::QualifiedMajority => 0.6,
        }
    }

    /// Pick the strategy used to advise voters on a proposal, from the
    /// proposal's own binding threshold
    pub fn for_threshold(required_threshold: f64) -> Self {
        if required_threshold >= 1.0 {
            VotingStrategy::Unanimous
        } else if required_threshold >= 0.66 {
            VotingStrategy::Supermajority
        } else {
            VotingStrategy::SimpleMajority
        }
    }

    /// Canonical name, as stored and displayed
    pub fn name(&self) -> &'static str {
        match self {
            VotingStrategy::SimpleMajority => "simple-majority",
            VotingStrategy::Supermajority => "supermajority",
            VotingStrategy::Unanimous => "unanimous",
            VotingStrategy::QualifiedMajority => "qualified-majority",
        }
    }
}

impl std::fmt::Display for VotingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for VotingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple-majority" | "majority" => Ok(VotingStrategy::SimpleMajority),
            "supermajority" => Ok(VotingStrategy::Supermajority),
            "unanimous" => Ok(VotingStrategy::Unanimous),
            "qualified-majority" => Ok(VotingStrategy::QualifiedMajority),
            _ => Err(format!(
                "Unknown voting strategy: {}. Valid: simple-majority, supermajority, unanimous, qualified-majority",
                s
            )),
        }
    }
}

/// Non-binding advice returned to an agent asking how to vote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecommendation {
    /// Suggested vote
    pub approve: bool,
    /// Confidence in the suggestion (0.0 to 1.0)
    pub confidence: f64,
    /// Human-readable reasoning
    pub reasoning: String,
    /// Factors that contributed to the suggestion
    pub factors: Vec<String>,
}

impl VoteRecommendation {
    /// Create a recommendation, clamping confidence into range
    pub fn new(approve: bool, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            approve,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            factors: Vec::new(),
        }
    }

    /// Attach contributing factors
    pub fn with_factors(mut self, factors: Vec<String>) -> Self {
        self.factors = factors;
        self
    }
}
