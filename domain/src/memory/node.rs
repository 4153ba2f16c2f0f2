//! Peer node descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness state of a peer node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Answering requests
    #[default]
    Active,
    /// Known but not currently reachable
    Inactive,
    /// Declared dead after repeated failures
    Failed,
}

/// A cooperating node that may hold replicas of local keys
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedNode {
    /// Node identifier
    pub id: String,
    /// Transport address (opaque to this layer)
    pub address: String,
    /// Liveness state
    pub status: NodeStatus,
    /// Load figure reported by the node (0.0 to 1.0)
    pub load: f64,
    /// Last time the node was seen answering
    pub last_seen_at: DateTime<Utc>,
    /// Key-partition this node owns
    pub partition_key: String,
    /// Nodes this node replicates to
    pub replication_peers: Vec<String>,
}

impl DistributedNode {
    /// Describe a newly discovered active node
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            status: NodeStatus::Active,
            load: 0.0,
            last_seen_at: Utc::now(),
            partition_key: String::new(),
            replication_peers: Vec::new(),
        }
    }

    /// Whether the node should currently be offered work
    pub fn is_available(&self) -> bool {
        self.status == NodeStatus::Active
    }
}
