//! Advisory pattern-analysis port

use async_trait::async_trait;
use hivemind_domain::VotingStrategy;

/// What the analyzer is asked to look at
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Proposal being considered
    pub proposal_id: String,
    /// Opaque proposal content
    pub content: serde_json::Value,
    /// Strategy selected for the recommendation
    pub strategy: VotingStrategy,
    /// Capability class of the agent asking for advice
    pub agent_type: String,
    /// Approval ratio among the votes cast so far
    pub current_ratio: f64,
}

/// Score returned by the analyzer
#[derive(Debug, Clone)]
pub struct PatternScore {
    /// Support for approval, 0.0 (reject) to 1.0 (approve)
    pub recommendation: f64,
    /// How sure the analyzer is of its score
    pub confidence: f64,
    /// Signals that contributed to the score
    pub factors: Vec<String>,
}

/// Pattern-scoring collaborator
///
/// Strictly advisory: its output feeds vote *recommendations* and never
/// decides consensus itself. Implementations are expected to degrade to a
/// neutral score rather than fail.
#[async_trait]
pub trait PatternAnalyzer: Send + Sync {
    async fn score(&self, context: &AnalysisContext) -> PatternScore;
}

impl PatternScore {
    /// A score carrying no signal either way
    pub fn neutral() -> Self {
        Self {
            recommendation: 0.5,
            confidence: 0.0,
            factors: vec!["no signal".to_string()],
        }
    }
}
