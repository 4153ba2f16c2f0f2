//! Consensus-side adapters

mod channel_broadcast;
mod heuristic_analyzer;
mod memory_repository;
mod task_executor;

pub use channel_broadcast::{ChannelBroadcast, SwarmMessage};
pub use heuristic_analyzer::HeuristicAnalyzer;
pub use memory_repository::InMemoryProposalRepository;
pub use task_executor::{InMemoryTaskExecutor, TaskRecord};
