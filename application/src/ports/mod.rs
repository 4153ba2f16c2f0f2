//! Ports (collaborator interfaces) for the application layer
//!
//! These traits define what the engines expect from the outside world.
//! Implementations (adapters) live in the infrastructure layer.
//!
//! Consensus-side ports:
//! - [`proposal_repository::ProposalRepository`] — proposal and vote persistence
//! - [`broadcast::SwarmBroadcast`] — fire-and-forget agent notification
//! - [`analysis::PatternAnalyzer`] — advisory pattern scoring
//! - [`task_executor::TaskExecutor`] — applying bound decisions to tasks
//!
//! Memory-side ports:
//! - [`local_store::LocalStore`] — durable local key-value store
//! - [`peer_transport::PeerTransport`] — cross-node fetch/replicate/delete
//! - [`codec::ValueCodec`] — pluggable compression encode/decode hook

pub mod analysis;
pub mod broadcast;
pub mod codec;
pub mod local_store;
pub mod peer_transport;
pub mod proposal_repository;
pub mod task_executor;
