//! Quorum consensus engine
//!
//! Turns independent agent votes into a binding decision under a deadline.
//!
//! The engine is a single logical actor: all mutable state (the active
//! proposal set and the rolling stats) lives behind one `tokio::sync::Mutex`,
//! and every path that mutates it — vote submission, the background sweeps,
//! the per-proposal deadline check — funnels through the same
//! [`ConsensusEngine::evaluate`] routine, guarded by the proposal's current
//! status so re-evaluation of a resolved proposal is a no-op.

use crate::ports::analysis::{AnalysisContext, PatternAnalyzer};
use crate::ports::broadcast::{BroadcastError, SwarmBroadcast};
use crate::ports::proposal_repository::{ProposalRepository, RepositoryError};
use crate::ports::task_executor::{TaskError, TaskExecutor};
use chrono::Utc;
use hivemind_domain::{
    ConsensusResult, HiveError, Proposal, ProposalStatus, TaskDecision, Vote, VoteRecommendation,
    VoteTally, VotingStrategy,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::ConsensusEvent;

/// Errors that can occur during consensus operations
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Proposal not found: {0}")]
    NotFound(String),

    #[error("Invalid: {0}")]
    Invalid(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("Task execution error: {0}")]
    Task(#[from] TaskError),
}

impl ConsensusError {
    /// Map into the domain error taxonomy
    pub fn classify(&self) -> HiveError {
        match self {
            ConsensusError::NotFound(id) => HiveError::NotFound(id.clone()),
            ConsensusError::Invalid(msg) => HiveError::Invalid(msg.clone()),
            ConsensusError::Repository(e) => HiveError::Transport(e.to_string()),
            ConsensusError::Broadcast(e) => HiveError::Transport(e.to_string()),
            ConsensusError::Task(e) => HiveError::Internal(e.to_string()),
        }
    }
}

/// Timer periods and tuning knobs for a [`ConsensusEngine`]
///
/// Correctness never depends on the exact periods, only on each sweep
/// eventually running after every deadline.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Period of the active-proposal re-check sweep
    pub sweep_interval: Duration,
    /// Period of the deadline sweep
    pub deadline_interval: Duration,
    /// Period of the metrics sweep
    pub metrics_interval: Duration,
    /// How many recent proposals feed the average-voting-time figure
    pub recent_window: usize,
    /// Smoothing factor for the participation moving average
    pub participation_alpha: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            deadline_interval: Duration::from_secs(1),
            metrics_interval: Duration::from_secs(30),
            recent_window: 50,
            participation_alpha: 0.3,
        }
    }
}

/// Rolling engine statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetrics {
    /// Proposals ever created on this engine
    pub total_proposals: u64,
    /// Proposals that reached their threshold
    pub achieved_consensus: u64,
    /// Proposals that failed
    pub failed_consensus: u64,
    /// Average time from creation to resolution, milliseconds
    pub avg_voting_time_ms: f64,
    /// Exponential moving average of participation rates
    pub avg_participation: f64,
}

/// Point-in-time view of a proposal's voting state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalStatusView {
    pub proposal_id: String,
    pub status: ProposalStatus,
    pub tally: VoteTally,
    /// positive / votes cast; 0.0 with no votes
    pub current_ratio: f64,
    /// Milliseconds until the deadline; `None` without one
    pub time_remaining_ms: Option<i64>,
}

struct ActiveProposal {
    proposal: Proposal,
    expected_voters: usize,
}

#[derive(Default)]
struct EngineState {
    active: HashMap<String, ActiveProposal>,
    /// Deadlines whose failed-check already fired, so the deadline sweep
    /// fires at most once per elapsed deadline
    fired_deadlines: HashSet<String>,
    stats: EngineMetrics,
    resolved_count: u64,
}

/// Quorum-based consensus engine
///
/// Collaborators are injected; the engine owns only the active working set
/// and its counters. Construct it inside an `Arc` — deadline scheduling and
/// the background sweeps clone the handle.
pub struct ConsensusEngine {
    repository: Arc<dyn ProposalRepository>,
    broadcaster: Arc<dyn SwarmBroadcast>,
    analyzer: Arc<dyn PatternAnalyzer>,
    tasks: Arc<dyn TaskExecutor>,
    config: ConsensusConfig,
    state: Mutex<EngineState>,
    events: broadcast::Sender<ConsensusEvent>,
}

impl ConsensusEngine {
    pub fn new(
        repository: Arc<dyn ProposalRepository>,
        broadcaster: Arc<dyn SwarmBroadcast>,
        analyzer: Arc<dyn PatternAnalyzer>,
        tasks: Arc<dyn TaskExecutor>,
        config: ConsensusConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            repository,
            broadcaster,
            analyzer,
            tasks,
            config,
            state: Mutex::new(EngineState::default()),
            events,
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<ConsensusEvent> {
        self.events.subscribe()
    }

    /// Create a proposal and initiate voting.
    ///
    /// Fails atomically: if persistence or the voting-request broadcast
    /// fails, no partial proposal is left in the active set.
    pub async fn create_proposal(
        self: &Arc<Self>,
        proposal: Proposal,
        expected_voters: usize,
    ) -> Result<String, ConsensusError> {
        proposal
            .validate()
            .map_err(|e| ConsensusError::Invalid(e.to_string()))?;

        self.repository.save_proposal(&proposal).await?;

        // Initiate voting before admitting the proposal to the active set
        let request = serde_json::json!({
            "proposalId": proposal.id,
            "content": proposal.content,
            "requiredThreshold": proposal.required_threshold,
            "deadline": proposal.deadline,
        });
        self.broadcaster
            .broadcast(&proposal.swarm_id, "consensus.vote.request", request)
            .await?;

        let id = proposal.id.clone();
        let swarm_id = proposal.swarm_id.clone();
        let deadline = proposal.deadline;

        {
            let mut state = self.state.lock().await;
            state.stats.total_proposals += 1;
            state.active.insert(
                id.clone(),
                ActiveProposal {
                    proposal,
                    expected_voters,
                },
            );
        }

        info!(proposal_id = %id, %swarm_id, expected_voters, "proposal created");
        self.emit(ConsensusEvent::ProposalCreated {
            proposal_id: id.clone(),
            swarm_id,
        });

        // Schedule the failed-check for exactly the deadline instant
        if let Some(deadline) = deadline {
            let engine = Arc::clone(self);
            let proposal_id = id.clone();
            tokio::spawn(async move {
                let wait = (deadline - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                let mut state = engine.state.lock().await;
                if !state.active.contains_key(&proposal_id) {
                    // Resolved before the deadline; nothing left to check
                    return;
                }
                state.fired_deadlines.insert(proposal_id.clone());
                if let Err(e) = engine.evaluate(&mut state, &proposal_id).await {
                    warn!(%proposal_id, error = %e, "deadline check failed");
                    engine.emit(ConsensusEvent::SweepError {
                        detail: format!("deadline check for {proposal_id}: {e}"),
                    });
                }
            });
        }

        Ok(id)
    }

    /// Submit (or overwrite) an agent's vote and re-evaluate synchronously,
    /// so a decisive vote resolves the proposal without waiting for a sweep.
    pub async fn submit_vote(&self, vote: Vote) -> Result<(), ConsensusError> {
        vote.validate()
            .map_err(|e| ConsensusError::Invalid(e.to_string()))?;

        let mut state = self.state.lock().await;
        {
            let active = state
                .active
                .get(&vote.proposal_id)
                .ok_or_else(|| ConsensusError::NotFound(vote.proposal_id.clone()))?;

            if active.proposal.deadline_elapsed(Utc::now()) {
                return Err(ConsensusError::Invalid(format!(
                    "proposal {} deadline has passed",
                    vote.proposal_id
                )));
            }
        }

        // Durable first: a failed save must leave the live tally untouched,
        // or a later sweep could bind on a vote the store never saw.
        self.repository
            .save_vote(&vote.proposal_id, &vote.agent_id, vote.approve, &vote.reason)
            .await?;

        // The lock is held across the save, so the entry cannot vanish
        if let Some(active) = state.active.get_mut(&vote.proposal_id) {
            active
                .proposal
                .record_vote(&vote.agent_id, vote.approve, &vote.reason);
        }

        debug!(
            proposal_id = %vote.proposal_id,
            agent_id = %vote.agent_id,
            approve = vote.approve,
            "vote recorded"
        );
        self.emit(ConsensusEvent::VoteRecorded {
            proposal_id: vote.proposal_id.clone(),
            agent_id: vote.agent_id.clone(),
            approve: vote.approve,
        });

        self.evaluate(&mut state, &vote.proposal_id).await?;
        Ok(())
    }

    /// Current tally, ratio, and time remaining for a proposal.
    ///
    /// Resolved proposals are no longer active but stay queryable through
    /// the repository.
    pub async fn status(&self, proposal_id: &str) -> Result<ProposalStatusView, ConsensusError> {
        let state = self.state.lock().await;
        let proposal = match state.active.get(proposal_id) {
            Some(active) => active.proposal.clone(),
            None => {
                drop(state);
                self.repository
                    .load_proposal(proposal_id)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound(id) => ConsensusError::NotFound(id),
                        other => ConsensusError::Repository(other),
                    })?
            }
        };

        let tally = proposal.tally();
        Ok(ProposalStatusView {
            proposal_id: proposal.id.clone(),
            status: proposal.status,
            current_ratio: tally.ratio(),
            time_remaining_ms: proposal.time_remaining_ms(Utc::now()),
            tally,
        })
    }

    /// Advise an agent how to vote.
    ///
    /// The strategy is selected from the proposal's own threshold, but it
    /// only shapes this advice; the binding gate stays the raw threshold.
    pub async fn recommend_vote(
        &self,
        proposal_id: &str,
        agent_id: &str,
        agent_type: &str,
    ) -> Result<VoteRecommendation, ConsensusError> {
        let (content, threshold, ratio) = {
            let state = self.state.lock().await;
            let active = state
                .active
                .get(proposal_id)
                .ok_or_else(|| ConsensusError::NotFound(proposal_id.to_string()))?;
            (
                active.proposal.content.clone(),
                active.proposal.required_threshold,
                active.proposal.tally().ratio(),
            )
        };

        let strategy = VotingStrategy::for_threshold(threshold);
        let score = self
            .analyzer
            .score(&AnalysisContext {
                proposal_id: proposal_id.to_string(),
                content,
                strategy,
                agent_type: agent_type.to_string(),
                current_ratio: ratio,
            })
            .await;

        // Stricter policies demand a stronger approval signal
        let bar = (strategy.threshold() + 0.5) / 2.0;
        let approve = score.recommendation >= bar;

        debug!(
            %proposal_id,
            %agent_id,
            strategy = %strategy,
            recommendation = score.recommendation,
            "vote recommendation computed"
        );

        let mut factors = score.factors;
        factors.push(format!("strategy: {strategy}"));

        Ok(VoteRecommendation::new(
            approve,
            score.confidence,
            format!(
                "{} under {} policy: pattern score {:.2} against bar {:.2}",
                if approve { "approve" } else { "reject" },
                strategy,
                score.recommendation,
                bar
            ),
        )
        .with_factors(factors))
    }

    /// Re-run the internal consensus evaluation for one proposal.
    ///
    /// Exposed for operator-triggered re-evaluation; idempotent on
    /// resolved proposals.
    pub async fn force_check(
        &self,
        proposal_id: &str,
    ) -> Result<Option<ConsensusResult>, ConsensusError> {
        let mut state = self.state.lock().await;
        self.evaluate(&mut state, proposal_id).await
    }

    /// Snapshot of the rolling engine statistics
    pub async fn metrics(&self) -> EngineMetrics {
        self.state.lock().await.stats.clone()
    }

    /// Start the background sweeps; cancel the returned token to stop them
    pub fn start(self: &Arc<Self>) -> CancellationToken {
        let token = CancellationToken::new();

        // Proposal sweep: re-check every active proposal
        {
            let engine = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(engine.config.sweep_interval);
                tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick.tick() => engine.sweep_proposals().await,
                    }
                }
            });
        }

        // Deadline sweep: fire the failed-check once per elapsed deadline
        {
            let engine = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(engine.config.deadline_interval);
                tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick.tick() => engine.sweep_deadlines().await,
                    }
                }
            });
        }

        // Metrics sweep: recompute voting-time averages, persist a snapshot
        {
            let engine = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(engine.config.metrics_interval);
                tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick.tick() => engine.sweep_metrics().await,
                    }
                }
            });
        }

        token
    }

    /// The single consensus-evaluation routine.
    ///
    /// Called from the vote path, the sweeps, the deadline check, and
    /// `force_check`. Returns the result when the call resolved the
    /// proposal; `None` when it stays pending or was already resolved.
    async fn evaluate(
        &self,
        state: &mut EngineState,
        proposal_id: &str,
    ) -> Result<Option<ConsensusResult>, ConsensusError> {
        let Some(active) = state.active.get(proposal_id) else {
            // Already resolved (possibly by a concurrent sweep); terminal
            // states are immutable, so there is nothing to do.
            return Ok(None);
        };

        let tally = active.proposal.tally();
        let expected = active.expected_voters;
        let threshold = active.proposal.required_threshold;
        let now = Utc::now();

        let voting_closed = active.proposal.deadline_elapsed(now)
            || (expected > 0 && tally.total >= expected);

        let status = if voting_closed {
            // Nobody else is voting; the ratio over votes cast is final
            if tally.meets(threshold) {
                ProposalStatus::Achieved
            } else {
                ProposalStatus::Failed
            }
        } else if tally.decisive(expected, threshold) {
            // Bind early only once the outstanding voters can no longer
            // pull the final ratio under the threshold
            ProposalStatus::Achieved
        } else {
            return Ok(None);
        };
        let achieved = status == ProposalStatus::Achieved;

        // Persist the transition first; if this fails the proposal stays
        // pending in the active set and the next sweep retries.
        self.repository
            .update_proposal_status(proposal_id, status)
            .await?;

        let Some(mut resolved) = state.active.remove(proposal_id) else {
            return Ok(None);
        };
        resolved.proposal.resolve(status);
        state.fired_deadlines.remove(proposal_id);

        let result = ConsensusResult::from_tally(tally, expected, achieved);

        // Rolling bookkeeping
        state.resolved_count += 1;
        if achieved {
            state.stats.achieved_consensus += 1;
        } else {
            state.stats.failed_consensus += 1;
        }
        let alpha = self.config.participation_alpha;
        state.stats.avg_participation = if state.resolved_count == 1 {
            result.participation_rate
        } else {
            alpha * result.participation_rate + (1.0 - alpha) * state.stats.avg_participation
        };

        info!(
            %proposal_id,
            status = %status,
            ratio = result.final_ratio,
            participation = result.participation_rate,
            "proposal resolved"
        );

        // Announce the outcome. The decision is already durable, so a
        // broadcast failure is reported, not propagated.
        let announcement = serde_json::json!({
            "proposalId": proposal_id,
            "result": result,
        });
        if let Err(e) = self
            .broadcaster
            .broadcast(
                &resolved.proposal.swarm_id,
                if achieved {
                    "consensus.achieved"
                } else {
                    "consensus.failed"
                },
                announcement,
            )
            .await
        {
            warn!(%proposal_id, error = %e, "result broadcast failed");
            self.emit(ConsensusEvent::SweepError {
                detail: format!("result broadcast for {proposal_id}: {e}"),
            });
        }

        // Apply the encoded decision to the referenced task
        if achieved && let Some(task_id) = resolved.proposal.task_id.clone() {
            if let Err(e) = self.apply_decision(&resolved.proposal, &task_id).await {
                warn!(%proposal_id, %task_id, error = %e, "task decision failed");
                self.emit(ConsensusEvent::SweepError {
                    detail: format!("task decision for {proposal_id}: {e}"),
                });
            }
        }

        self.emit(if achieved {
            ConsensusEvent::Achieved {
                proposal_id: proposal_id.to_string(),
                result: result.clone(),
            }
        } else {
            ConsensusEvent::Failed {
                proposal_id: proposal_id.to_string(),
                result: result.clone(),
            }
        });

        Ok(Some(result))
    }

    async fn apply_decision(&self, proposal: &Proposal, task_id: &str) -> Result<(), TaskError> {
        match proposal.task_decision() {
            Some(TaskDecision::ApproveTask) => self.tasks.set_task_status(task_id, "approved").await,
            Some(TaskDecision::ModifyTask(patch)) => {
                self.tasks.apply_task_modification(task_id, &patch).await
            }
            Some(TaskDecision::CancelTask) => self.tasks.set_task_status(task_id, "cancelled").await,
            None => Ok(()),
        }
    }

    async fn sweep_proposals(&self) {
        let mut state = self.state.lock().await;
        let ids: Vec<String> = state.active.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.evaluate(&mut state, &id).await {
                warn!(proposal_id = %id, error = %e, "proposal sweep iteration failed");
                self.emit(ConsensusEvent::SweepError {
                    detail: format!("proposal sweep for {id}: {e}"),
                });
            }
        }
    }

    async fn sweep_deadlines(&self) {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let due: Vec<String> = state
            .active
            .iter()
            .filter(|(id, active)| {
                active.proposal.deadline_elapsed(now) && !state.fired_deadlines.contains(*id)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in due {
            state.fired_deadlines.insert(id.clone());
            if let Err(e) = self.evaluate(&mut state, &id).await {
                warn!(proposal_id = %id, error = %e, "deadline sweep iteration failed");
                self.emit(ConsensusEvent::SweepError {
                    detail: format!("deadline sweep for {id}: {e}"),
                });
            }
        }
    }

    async fn sweep_metrics(&self) {
        let timings = match self
            .repository
            .list_recent_proposals(self.config.recent_window)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "metrics sweep could not list recent proposals");
                self.emit(ConsensusEvent::SweepError {
                    detail: format!("metrics sweep: {e}"),
                });
                return;
            }
        };

        let durations: Vec<f64> = timings
            .iter()
            .filter_map(|t| t.completed_at.map(|done| (done - t.created_at).num_milliseconds() as f64))
            .collect();

        let snapshot = {
            let mut state = self.state.lock().await;
            if !durations.is_empty() {
                state.stats.avg_voting_time_ms =
                    durations.iter().sum::<f64>() / durations.len() as f64;
            }
            state.stats.clone()
        };

        if let Err(e) = self
            .repository
            .save_metrics(serde_json::to_value(&snapshot).unwrap_or_default())
            .await
        {
            warn!(error = %e, "metrics snapshot persistence failed");
            self.emit(ConsensusEvent::SweepError {
                detail: format!("metrics persistence: {e}"),
            });
        }

        self.emit(ConsensusEvent::Metrics { snapshot });
    }

    fn emit(&self, event: ConsensusEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
