//! Application layer for hive-mind
//!
//! This crate hosts the two engines and the ports they depend on:
//!
//! - [`consensus::ConsensusEngine`] — proposal lifecycle, vote intake,
//!   deadline enforcement, decision broadcast and task execution.
//! - [`memory::DistributedMemoryManager`] — bounded cache, durable local
//!   store, and best-effort replication/prefetch/batching behind one
//!   key-value surface.
//!
//! Each engine owns its mutable state exclusively (single-writer
//! discipline); collaborators are injected through the traits in
//! [`ports`], with adapters living in the infrastructure layer.
//! The two engines never call each other.

pub mod consensus;
pub mod memory;
pub mod ports;

pub use consensus::{
    ConsensusConfig, ConsensusEngine, ConsensusError, ConsensusEvent, EngineMetrics,
    ProposalStatusView,
};
pub use memory::{
    CacheMap, DistributedMemoryManager, MemoryConfig, MemoryError, MemoryEvent,
};
pub use ports::{
    analysis::{AnalysisContext, PatternAnalyzer, PatternScore},
    broadcast::{BroadcastError, SwarmBroadcast},
    codec::{CodecError, ValueCodec},
    local_store::{LocalStore, StoreError},
    peer_transport::{PeerTransport, TransportError},
    proposal_repository::{ProposalRepository, ProposalTimings, RepositoryError},
    task_executor::{TaskError, TaskExecutor},
};
