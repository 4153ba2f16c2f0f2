//! Typed events emitted by the memory manager
//!
//! Dashboards and loggers key off the dotted names, so
//! [`MemoryEvent::name`] is part of the manager's contract.

use hivemind_domain::PerformanceMetrics;

/// Observability events from a [`super::DistributedMemoryManager`]
#[derive(Debug, Clone)]
pub enum MemoryEvent {
    /// Best-effort replication of a write did not reach its peers
    ReplicationFailed { key: String, detail: String },
    /// A prefetch pass finished; `resolved` keys are now cache-resident
    PrefetchCompleted { origin_key: String, resolved: usize },
    /// The batched writer flushed queued writes to the durable store
    BatchFlushed { entries: usize },
    /// A latency or error-rate threshold was crossed
    PerformanceWarning {
        issues: Vec<String>,
        metrics: PerformanceMetrics,
    },
}

impl MemoryEvent {
    /// Stable dotted event name
    pub fn name(&self) -> &'static str {
        match self {
            MemoryEvent::ReplicationFailed { .. } => "memory.replication.failed",
            MemoryEvent::PrefetchCompleted { .. } => "memory.prefetch.completed",
            MemoryEvent::BatchFlushed { .. } => "memory.batch.flushed",
            MemoryEvent::PerformanceWarning { .. } => "memory.performance.warning",
        }
    }
}
