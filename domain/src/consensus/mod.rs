//! Consensus domain
//!
//! Core concepts for quorum-based decision making across a swarm of agents.
//!
//! A [`Proposal`](proposal::Proposal) collects one [`VoteRecord`](proposal::VoteRecord)
//! per agent. The approval ratio is computed over the votes actually cast —
//! not over the expected electorate — and the proposal binds the moment that
//! ratio reaches its `required_threshold`. Deadlines and full participation
//! are the only other ways a proposal resolves.
//!
//! [`VotingStrategy`](strategy::VotingStrategy) is deliberately separate
//! from the binding threshold: a strategy only shapes the *recommendation*
//! handed to an agent, never the gate the proposal itself must pass.

pub mod proposal;
pub mod strategy;
pub mod vote;

// Re-export main types
pub use proposal::{Proposal, ProposalStatus, TaskDecision, VoteRecord};
pub use strategy::{VoteRecommendation, VotingStrategy};
pub use vote::{ConsensusResult, Vote, VoteTally};
