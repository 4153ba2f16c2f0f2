//! Proposal entity and its lifecycle
//!
//! A proposal is the unit of group decision making: an opaque piece of
//! content that agents vote on until a threshold binds it or it fails.

use crate::core::error::HiveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::vote::VoteTally;

/// Lifecycle state of a proposal
///
/// `Pending` is the only non-terminal state. Once a proposal reaches
/// `Achieved` or `Failed` it never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Collecting votes
    Pending,
    /// Threshold reached: the decision is binding
    Achieved,
    /// Deadline elapsed or electorate exhausted below threshold
    Failed,
}

impl ProposalStatus {
    /// Check if this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Pending => write!(f, "pending"),
            ProposalStatus::Achieved => write!(f, "achieved"),
            ProposalStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single agent's recorded position on a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    /// Whether the agent approved
    pub approve: bool,
    /// Reasoning or feedback from the agent
    pub reason: String,
    /// When the vote was recorded
    pub timestamp: DateTime<Utc>,
}

/// A pending decision requiring agent votes to reach a threshold
///
/// # Example
///
/// ```
/// use hivemind_domain::{Proposal, ProposalStatus};
/// use serde_json::json;
///
/// let proposal = Proposal::new("swarm-1", json!({"topic": "scale up"}), 0.66);
/// assert_eq!(proposal.status, ProposalStatus::Pending);
/// assert!(proposal.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    /// Unique proposal identifier
    pub id: String,
    /// Swarm whose agents are eligible to vote
    pub swarm_id: String,
    /// Task this decision applies to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Opaque content describing the decision
    pub content: serde_json::Value,
    /// Fraction of positive votes (among votes cast) required to bind
    pub required_threshold: f64,
    /// Absolute instant after which no further votes are accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Current lifecycle state
    pub status: ProposalStatus,
    /// One vote per agent; a later vote overwrites an earlier one
    pub votes: HashMap<String, VoteRecord>,
    /// When the proposal was created
    pub created_at: DateTime<Utc>,
    /// When the proposal reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Create a new pending proposal with a generated id
    pub fn new(
        swarm_id: impl Into<String>,
        content: serde_json::Value,
        required_threshold: f64,
    ) -> Self {
        Self {
            id: generate_id(),
            swarm_id: swarm_id.into(),
            task_id: None,
            content,
            required_threshold,
            deadline: None,
            status: ProposalStatus::Pending,
            votes: HashMap::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Use a caller-supplied id instead of a generated one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a deadline
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Reference a task so the bound decision gets applied to it
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Validate the proposal's invariants
    ///
    /// The threshold must be in `(0, 1]`.
    pub fn validate(&self) -> Result<(), HiveError> {
        if !(self.required_threshold > 0.0 && self.required_threshold <= 1.0) {
            return Err(HiveError::Invalid(format!(
                "required threshold must be in (0, 1], got {}",
                self.required_threshold
            )));
        }
        Ok(())
    }

    /// Record an agent's vote; re-voting overwrites the earlier record
    pub fn record_vote(&mut self, agent_id: impl Into<String>, approve: bool, reason: impl Into<String>) {
        self.votes.insert(
            agent_id.into(),
            VoteRecord {
                approve,
                reason: reason.into(),
                timestamp: Utc::now(),
            },
        );
    }

    /// Aggregate the votes cast so far
    pub fn tally(&self) -> VoteTally {
        let positive = self.votes.values().filter(|v| v.approve).count();
        VoteTally::new(positive, self.votes.len())
    }

    /// Whether the deadline (if any) has passed at `now`
    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Milliseconds until the deadline, clamped at zero; `None` without one
    pub fn time_remaining_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.deadline
            .map(|d| (d - now).num_milliseconds().max(0))
    }

    /// Check if the proposal is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to a terminal state.
    ///
    /// Returns `false` without mutating anything if the proposal has
    /// already resolved; terminal states are immutable.
    pub fn resolve(&mut self, status: ProposalStatus) -> bool {
        if self.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Parse the task decision encoded in the content, if any
    pub fn task_decision(&self) -> Option<TaskDecision> {
        TaskDecision::from_content(&self.content)
    }
}

/// Decision encoded in a proposal's content, applied to its task on success
#[derive(Debug, Clone, PartialEq)]
pub enum TaskDecision {
    /// Mark the task approved and let it run
    ApproveTask,
    /// Patch the task definition before it runs
    ModifyTask(serde_json::Value),
    /// Cancel the task outright
    CancelTask,
}

impl TaskDecision {
    /// Read the `action` field of a proposal's content
    pub fn from_content(content: &serde_json::Value) -> Option<Self> {
        match content.get("action").and_then(|a| a.as_str())? {
            "approve_task" => Some(TaskDecision::ApproveTask),
            "modify_task" => Some(TaskDecision::ModifyTask(
                content.get("patch").cloned().unwrap_or(serde_json::Value::Null),
            )),
            "cancel_task" => Some(TaskDecision::CancelTask),
            _ => None,
        }
    }
}

/// Generate a unique proposal id from the clock plus a process-local counter
fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("proposal-{}-{}", Utc::now().timestamp_millis(), seq)
}
