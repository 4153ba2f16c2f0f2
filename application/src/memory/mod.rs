//! Distributed memory manager
//!
//! One key-value surface over a bounded local cache, a durable local store,
//! and best-effort cross-node replication and prefetch.
//! See [`manager::DistributedMemoryManager`].

pub mod cache;
pub mod events;
pub mod manager;

pub use cache::CacheMap;
pub use events::MemoryEvent;
pub use manager::{DistributedMemoryManager, MemoryConfig, MemoryError};
