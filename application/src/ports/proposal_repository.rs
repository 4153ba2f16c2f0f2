//! Proposal persistence port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hivemind_domain::{Proposal, ProposalStatus};
use thiserror::Error;

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Proposal not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Creation/completion timestamps of a recently stored proposal,
/// used by the metrics sweep to compute average voting time
#[derive(Debug, Clone, Copy)]
pub struct ProposalTimings {
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persistence collaborator for the consensus engine
///
/// The engine keeps the active working set in memory; this port is the
/// durable record proposals remain queryable from after they resolve.
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Persist a proposal (upsert by id)
    async fn save_proposal(&self, proposal: &Proposal) -> Result<(), RepositoryError>;

    /// Load a proposal by id
    async fn load_proposal(&self, id: &str) -> Result<Proposal, RepositoryError>;

    /// Persist a single vote, keyed by agent so a re-vote overwrites
    async fn save_vote(
        &self,
        proposal_id: &str,
        agent_id: &str,
        approve: bool,
        reason: &str,
    ) -> Result<(), RepositoryError>;

    /// Update only the status of a stored proposal
    async fn update_proposal_status(
        &self,
        id: &str,
        status: ProposalStatus,
    ) -> Result<(), RepositoryError>;

    /// Timestamps of the most recently created proposals, newest first
    async fn list_recent_proposals(
        &self,
        limit: usize,
    ) -> Result<Vec<ProposalTimings>, RepositoryError>;

    /// Persist a metrics snapshot from the metrics sweep
    async fn save_metrics(&self, snapshot: serde_json::Value) -> Result<(), RepositoryError>;
}
