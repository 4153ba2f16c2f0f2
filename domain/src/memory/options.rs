//! Per-operation options for the memory surface

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consistency label governing how hard a remote read tries
///
/// These are best-effort policies, not protocol guarantees: `Strong` waits
/// out the full peer-fetch timeout, `Eventual` and `Weak` give up early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Best-effort; the default
    #[default]
    Eventual,
    /// Like eventual, but skips peers under load
    Weak,
    /// Wait for a definitive peer answer within the timeout
    Strong,
}

/// Options for `get`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// How hard the peer-fetch step tries
    pub consistency: Consistency,
    /// Bound on the peer-fetch step only; local steps are assumed fast
    pub timeout: Option<Duration>,
}

impl ReadOptions {
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for `set`
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Push the value to replication peers (best-effort)
    pub replicate: bool,
    /// Enqueue for the batched writer instead of applying immediately
    pub batch: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            replicate: true,
            batch: false,
        }
    }
}

impl WriteOptions {
    pub fn without_replication(mut self) -> Self {
        self.replicate = false;
        self
    }

    pub fn batched(mut self) -> Self {
        self.batch = true;
        self
    }
}

/// Options for `delete`
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Also remove dependent keys (policy delegated to the durable store)
    pub cascade: bool,
    /// Skip the peer-node delete
    pub local_only: bool,
}

/// Options for `get_batch` / `set_batch`
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Window size for the bounded fan-out
    pub parallelism: usize,
    /// Apply the whole batch as one durable-store transaction (set only)
    pub atomic: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallelism: 10,
            atomic: false,
        }
    }
}

impl BatchOptions {
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }
}
