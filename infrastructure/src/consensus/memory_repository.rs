//! In-process proposal repository
//!
//! Keeps proposals, votes, and metrics snapshots in maps behind a mutex.
//! Suitable for single-process deployments and tests; a database-backed
//! adapter would replace this without touching the engine.

use async_trait::async_trait;
use chrono::Utc;
use hivemind_application::{ProposalRepository, ProposalTimings, RepositoryError};
use hivemind_domain::{Proposal, ProposalStatus};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct RepositoryState {
    proposals: HashMap<String, Proposal>,
    // Insertion order, newest last; drives list_recent_proposals
    order: Vec<String>,
    metrics: Vec<serde_json::Value>,
}

/// Proposal repository backed by process memory
#[derive(Default)]
pub struct InMemoryProposalRepository {
    state: Mutex<RepositoryState>,
}

impl InMemoryProposalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics snapshots saved so far, oldest first
    pub fn metrics_history(&self) -> Vec<serde_json::Value> {
        self.lock().metrics.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepositoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn save_proposal(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if !state.proposals.contains_key(&proposal.id) {
            state.order.push(proposal.id.clone());
        }
        state.proposals.insert(proposal.id.clone(), proposal.clone());
        Ok(())
    }

    async fn load_proposal(&self, id: &str) -> Result<Proposal, RepositoryError> {
        self.lock()
            .proposals
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn save_vote(
        &self,
        proposal_id: &str,
        agent_id: &str,
        approve: bool,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let proposal = state
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| RepositoryError::NotFound(proposal_id.to_string()))?;
        proposal.record_vote(agent_id, approve, reason);
        Ok(())
    }

    async fn update_proposal_status(
        &self,
        id: &str,
        status: ProposalStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let proposal = state
            .proposals
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        proposal.status = status;
        if status.is_terminal() && proposal.completed_at.is_none() {
            proposal.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_recent_proposals(
        &self,
        limit: usize,
    ) -> Result<Vec<ProposalTimings>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| state.proposals.get(id))
            .map(|p| ProposalTimings {
                created_at: p.created_at,
                completed_at: p.completed_at,
            })
            .collect())
    }

    async fn save_metrics(&self, snapshot: serde_json::Value) -> Result<(), RepositoryError> {
        self.lock().metrics.push(snapshot);
        Ok(())
    }
}
