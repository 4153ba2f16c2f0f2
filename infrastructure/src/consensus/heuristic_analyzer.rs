//! Heuristic pattern analyzer
//!
//! Scores proposals from simple content signals: declared risk, content
//! complexity, agent/content alignment, and the momentum of the votes cast
//! so far. Deliberately conservative; the neutral score is the baseline
//! and every factor nudges it.

use async_trait::async_trait;
use hivemind_application::{AnalysisContext, PatternAnalyzer, PatternScore};
use hivemind_domain::VotingStrategy;
use tracing::debug;

/// Content nodes above which a proposal counts as complex
const COMPLEXITY_LIMIT: usize = 40;

/// Stateless analyzer deriving a score from the proposal content itself
#[derive(Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PatternAnalyzer for HeuristicAnalyzer {
    async fn score(&self, context: &AnalysisContext) -> PatternScore {
        let mut recommendation: f64 = 0.5;
        let mut confidence: f64 = 0.3;
        let mut factors = Vec::new();

        // Declared risk dominates
        if let Some(risk) = context.content.get("risk").and_then(|r| r.as_str()) {
            match risk {
                "low" => {
                    recommendation += 0.2;
                    confidence += 0.2;
                    factors.push("low declared risk".to_string());
                }
                "high" | "critical" => {
                    recommendation -= 0.25;
                    confidence += 0.2;
                    factors.push(format!("{risk} declared risk"));
                }
                _ => {}
            }
        }

        // Large proposals are harder to judge; lean cautious
        let complexity = node_count(&context.content);
        if complexity > COMPLEXITY_LIMIT {
            recommendation -= 0.1;
            factors.push(format!("complex content ({complexity} nodes)"));
        }

        // A targeted proposal matching the asking agent's class
        if let Some(target) = context.content.get("agentType").and_then(|t| t.as_str()) {
            if target == context.agent_type {
                recommendation += 0.1;
                confidence += 0.1;
                factors.push("content targets this agent class".to_string());
            }
        }

        // Momentum of votes already cast
        if context.current_ratio > 0.0 {
            let pull = (context.current_ratio - 0.5) * 0.3;
            recommendation += pull;
            factors.push(format!(
                "current approval ratio {:.2}",
                context.current_ratio
            ));
        }

        // Unanimity demands a stricter eye
        if context.strategy == VotingStrategy::Unanimous {
            confidence += 0.1;
            factors.push("unanimous strategy in effect".to_string());
        }

        if factors.is_empty() {
            return PatternScore::neutral();
        }

        let score = PatternScore {
            recommendation: recommendation.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            factors,
        };
        debug!(
            proposal_id = %context.proposal_id,
            recommendation = score.recommendation,
            confidence = score.confidence,
            "heuristic score computed"
        );
        score
    }
}

/// Count the nodes of a JSON value, a rough complexity figure
fn node_count(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => 1 + items.iter().map(node_count).sum::<usize>(),
        serde_json::Value::Object(map) => 1 + map.values().map(node_count).sum::<usize>(),
        _ => 1,
    }
}
