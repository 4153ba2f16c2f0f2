//! Cache entry bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A locally cached value plus its access and replication bookkeeping
///
/// Entries are created when a key is first resolved locally, refreshed on
/// every hit, and evicted in strict LRU order by `last_accessed_at` once
/// the cache exceeds its capacity bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Key this entry caches
    pub key: String,
    /// Cached value (post-decode: never carries the compression marker)
    pub value: serde_json::Value,
    /// When the entry was first inserted
    pub inserted_at: DateTime<Utc>,
    /// Number of hits since insertion
    pub access_count: u64,
    /// Last hit time; the LRU eviction key
    pub last_accessed_at: DateTime<Utc>,
    /// Approximate serialized size
    pub size_bytes: usize,
    /// Whether the durable copy is stored compressed
    pub compressed: bool,
    /// Peer nodes known to hold a replica
    pub replica_node_ids: HashSet<String>,
}

impl CacheEntry {
    /// Create a fresh entry for a just-resolved key
    pub fn new(key: impl Into<String>, value: serde_json::Value, compressed: bool) -> Self {
        let key = key.into();
        let size_bytes = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(0);
        let now = Utc::now();

        Self {
            key,
            value,
            inserted_at: now,
            access_count: 0,
            last_accessed_at: now,
            size_bytes,
            compressed,
            replica_node_ids: HashSet::new(),
        }
    }

    /// Record a hit: bump the access count and refresh the LRU timestamp
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
    }

    /// Note that a replica now lives on `node_id`
    pub fn add_replica(&mut self, node_id: impl Into<String>) {
        self.replica_node_ids.insert(node_id.into());
    }
}
