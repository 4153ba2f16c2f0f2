//! Domain layer for hive-mind
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Consensus
//!
//! Agents in a swarm reach group decisions by voting on [`Proposal`]s.
//! A proposal binds once the approval ratio among the votes cast reaches its
//! `required_threshold`, or fails once its deadline elapses (or every
//! expected voter has voted) without reaching it.
//!
//! ## Distributed Memory
//!
//! Cooperating nodes share key-value state through a bounded local cache,
//! a durable local store, and best-effort replication to peers. The domain
//! types here ([`CacheEntry`], [`DistributedNode`], [`PerformanceMetrics`])
//! describe that state; orchestration lives in the application layer.

pub mod consensus;
pub mod core;
pub mod memory;

// Re-export commonly used types
pub use consensus::{
    proposal::{Proposal, ProposalStatus, TaskDecision, VoteRecord},
    strategy::{VoteRecommendation, VotingStrategy},
    vote::{ConsensusResult, Vote, VoteTally},
};
pub use crate::core::error::HiveError;
pub use memory::{
    entry::CacheEntry,
    metrics::{CacheStats, HealthReport, MetricsRecorder, OperationKind, PerformanceMetrics},
    node::{DistributedNode, NodeStatus},
    options::{BatchOptions, Consistency, DeleteOptions, ReadOptions, WriteOptions},
    prefetch::related_keys,
};
