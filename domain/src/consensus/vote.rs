//! Vote types for quorum consensus
//!
//! This module defines the voting primitives: the vote an agent submits,
//! the running tally over votes cast, and the final consensus result.

use crate::core::error::HiveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single vote submitted by an agent on a proposal
///
/// # Example
///
/// ```
/// use hivemind_domain::Vote;
///
/// let approval = Vote::approve("proposal-1", "agent-1", "capacity plan is sound");
/// assert!(approval.approve);
///
/// let rejection = Vote::reject("proposal-1", "agent-2", "budget not covered");
/// assert!(!rejection.approve);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Proposal being voted on
    pub proposal_id: String,
    /// Voting agent
    pub agent_id: String,
    /// Whether the agent approves
    pub approve: bool,
    /// Reasoning or feedback
    pub reason: String,
    /// When the vote was submitted
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    /// Create a new vote
    pub fn new(
        proposal_id: impl Into<String>,
        agent_id: impl Into<String>,
        approve: bool,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            agent_id: agent_id.into(),
            approve,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an approval vote
    pub fn approve(
        proposal_id: impl Into<String>,
        agent_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(proposal_id, agent_id, true, reason)
    }

    /// Create a rejection vote
    pub fn reject(
        proposal_id: impl Into<String>,
        agent_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(proposal_id, agent_id, false, reason)
    }

    /// Validate the vote payload
    pub fn validate(&self) -> Result<(), HiveError> {
        if self.proposal_id.trim().is_empty() {
            return Err(HiveError::Invalid("vote is missing a proposal id".into()));
        }
        if self.agent_id.trim().is_empty() {
            return Err(HiveError::Invalid("vote is missing an agent id".into()));
        }
        Ok(())
    }
}

/// Running aggregate over the votes cast on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    /// Approving votes
    pub positive: usize,
    /// Rejecting votes
    pub negative: usize,
    /// Total votes cast
    pub total: usize,
}

impl VoteTally {
    /// Build a tally from positive count and total cast
    pub fn new(positive: usize, total: usize) -> Self {
        Self {
            positive,
            negative: total - positive,
            total,
        }
    }

    /// Approval ratio over votes cast (0.0 when no votes yet)
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.positive as f64 / self.total as f64
        }
    }

    /// Whether the ratio meets a binding threshold
    pub fn meets(&self, threshold: f64) -> bool {
        self.total > 0 && self.ratio() >= threshold
    }

    /// Whether the approvals already cast settle the outcome no matter how
    /// the outstanding voters vote.
    ///
    /// With a known electorate the worst case is every outstanding voter
    /// rejecting, which leaves a final ratio of `positive / expected`. With
    /// an unknown electorate (`expected == 0`) the ratio over votes cast is
    /// the only signal, so this degrades to [`VoteTally::meets`].
    pub fn decisive(&self, expected: usize, threshold: f64) -> bool {
        if expected == 0 || self.total >= expected {
            return self.meets(threshold);
        }
        self.positive as f64 / expected as f64 >= threshold
    }
}

/// Final outcome of a proposal, derived when it resolves
///
/// Never persisted on its own: it is always recomputed from the
/// proposal's stored votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    /// Whether the threshold was reached
    pub achieved: bool,
    /// Approvals / votes cast
    pub final_ratio: f64,
    /// Votes cast
    pub total_votes: usize,
    /// Approving votes
    pub positive_votes: usize,
    /// Rejecting votes
    pub negative_votes: usize,
    /// Votes cast / expected voters (1.0 when the electorate is unknown)
    pub participation_rate: f64,
}

impl ConsensusResult {
    /// Derive the result from a tally and the expected electorate size
    pub fn from_tally(tally: VoteTally, expected_voters: usize, achieved: bool) -> Self {
        let participation_rate = if expected_voters == 0 {
            1.0
        } else {
            tally.total as f64 / expected_voters as f64
        };

        Self {
            achieved,
            final_ratio: tally.ratio(),
            total_votes: tally.total,
            positive_votes: tally.positive,
            negative_votes: tally.negative,
            participation_rate,
        }
    }
}
