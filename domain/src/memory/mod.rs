//! Distributed memory domain
//!
//! Entities and value objects for the shared key-value layer: cache entries
//! and their access bookkeeping, peer node descriptors, operation options,
//! performance metric windows, and the prefetch key derivation.

pub mod entry;
pub mod metrics;
pub mod node;
pub mod options;
pub mod prefetch;

// Re-export main types
pub use entry::CacheEntry;
pub use metrics::{CacheStats, HealthReport, MetricsRecorder, OperationKind, PerformanceMetrics};
pub use node::{DistributedNode, NodeStatus};
pub use options::{BatchOptions, Consistency, DeleteOptions, ReadOptions, WriteOptions};
pub use prefetch::related_keys;
