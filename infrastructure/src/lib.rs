//! Infrastructure layer: adapters behind the application ports
//!
//! Everything here implements a port from `hivemind-application` or loads
//! configuration. Nothing in this crate is reachable except through those
//! seams.

pub mod config;
pub mod consensus;
pub mod memory;

pub use config::{ConfigLoader, FileConfig};
pub use consensus::{
    ChannelBroadcast, HeuristicAnalyzer, InMemoryProposalRepository, InMemoryTaskExecutor,
};
pub use memory::{InMemoryStore, JsonlStore, LoopbackTransport, MarkerCompressionCodec};
