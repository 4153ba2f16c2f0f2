//! Consensus engine
//!
//! Owns proposal lifecycle, vote intake, deadline enforcement, and
//! decision broadcast/execution. See [`engine::ConsensusEngine`].

pub mod engine;
pub mod events;

pub use engine::{
    ConsensusConfig, ConsensusEngine, ConsensusError, EngineMetrics, ProposalStatusView,
};
pub use events::ConsensusEvent;
