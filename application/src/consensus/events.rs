//! Typed events emitted by the consensus engine
//!
//! External observers (dashboards, loggers) key off the dotted event names,
//! so [`ConsensusEvent::name`] is part of the engine's contract.

use hivemind_domain::ConsensusResult;

use super::engine::EngineMetrics;

/// State-change and metrics events from a [`super::ConsensusEngine`]
#[derive(Debug, Clone)]
pub enum ConsensusEvent {
    /// A proposal entered the active set and voting was initiated
    ProposalCreated {
        proposal_id: String,
        swarm_id: String,
    },
    /// A vote was persisted (possibly overwriting the agent's earlier vote)
    VoteRecorded {
        proposal_id: String,
        agent_id: String,
        approve: bool,
    },
    /// The proposal's threshold was reached
    Achieved {
        proposal_id: String,
        result: ConsensusResult,
    },
    /// Deadline elapsed or electorate exhausted below threshold
    Failed {
        proposal_id: String,
        result: ConsensusResult,
    },
    /// Periodic metrics snapshot
    Metrics { snapshot: EngineMetrics },
    /// A background sweep iteration failed; the loop continues next tick
    SweepError { detail: String },
}

impl ConsensusEvent {
    /// Stable dotted event name
    pub fn name(&self) -> &'static str {
        match self {
            ConsensusEvent::ProposalCreated { .. } => "consensus.proposal.created",
            ConsensusEvent::VoteRecorded { .. } => "consensus.vote.recorded",
            ConsensusEvent::Achieved { .. } => "consensus.achieved",
            ConsensusEvent::Failed { .. } => "consensus.failed",
            ConsensusEvent::Metrics { .. } => "consensus.metrics",
            ConsensusEvent::SweepError { .. } => "consensus.sweep.error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivemind_domain::VoteTally;

    #[test]
    fn test_event_names_are_stable() {
        let result = ConsensusResult::from_tally(VoteTally::new(2, 3), 3, true);

        let cases = [
            (
                ConsensusEvent::ProposalCreated {
                    proposal_id: "p".into(),
                    swarm_id: "s".into(),
                },
                "consensus.proposal.created",
            ),
            (
                ConsensusEvent::VoteRecorded {
                    proposal_id: "p".into(),
                    agent_id: "a".into(),
                    approve: true,
                },
                "consensus.vote.recorded",
            ),
            (
                ConsensusEvent::Achieved {
                    proposal_id: "p".into(),
                    result: result.clone(),
                },
                "consensus.achieved",
            ),
            (
                ConsensusEvent::Failed {
                    proposal_id: "p".into(),
                    result,
                },
                "consensus.failed",
            ),
            (
                ConsensusEvent::SweepError { detail: "x".into() },
                "consensus.sweep.error",
            ),
        ];

        for (event, expected) in cases {
            assert_eq!(event.name(), expected);
        }
    }
}
