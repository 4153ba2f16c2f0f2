//! Peer-node transport port

use async_trait::async_trait;
use hivemind_domain::{Consistency, DistributedNode};
use thiserror::Error;

/// Errors that can occur talking to peer nodes
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Peer transport timeout")]
    Timeout,

    #[error("Peer transport failure: {0}")]
    Failed(String),
}

/// Transport collaborator for cross-node replication and fetch
///
/// Node discovery and the wire protocol are entirely this collaborator's
/// concern; the manager only states *what* it wants moved where.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Ask peers for a key; `Ok(None)` when no peer holds it
    async fn fetch_remote(
        &self,
        key: &str,
        consistency: Consistency,
    ) -> Result<Option<serde_json::Value>, TransportError>;

    /// Push a value to the given peers (best-effort)
    async fn replicate_to(
        &self,
        peers: &[String],
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), TransportError>;

    /// Remove a key from the given peers
    async fn delete_remote(&self, peers: &[String], key: &str) -> Result<(), TransportError>;

    /// Enumerate currently known peer nodes
    async fn discover_peers(&self) -> Result<Vec<DistributedNode>, TransportError>;
}
