//! Loopback peer transport
//!
//! Simulates a peer group inside one process: a shared map stands in for
//! the union of values held by the peers, and the peer list is fixed at
//! construction. An optional artificial latency makes timeout paths
//! testable. Real deployments swap this for a network transport.

use async_trait::async_trait;
use hivemind_application::{PeerTransport, TransportError};
use hivemind_domain::{Consistency, DistributedNode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Peer transport that loops back into process memory
pub struct LoopbackTransport {
    peers: Vec<DistributedNode>,
    held: Mutex<HashMap<String, Value>>,
    latency: Option<Duration>,
}

impl LoopbackTransport {
    pub fn new(peers: Vec<DistributedNode>) -> Self {
        Self {
            peers,
            held: Mutex::new(HashMap::new()),
            latency: None,
        }
    }

    /// Delay every transport call, for exercising timeout handling
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Pre-place a value as if a peer already held it
    pub fn seed(&self, key: impl Into<String>, value: Value) {
        self.lock().insert(key.into(), value);
    }

    /// Number of keys the simulated peer group holds
    pub fn held_keys(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PeerTransport for LoopbackTransport {
    async fn fetch_remote(
        &self,
        key: &str,
        consistency: Consistency,
    ) -> Result<Option<Value>, TransportError> {
        self.simulate_latency().await;
        if self.peers.is_empty() {
            return Ok(None);
        }
        debug!(%key, ?consistency, "loopback fetch");
        Ok(self.lock().get(key).cloned())
    }

    async fn replicate_to(
        &self,
        peers: &[String],
        key: &str,
        value: &Value,
    ) -> Result<(), TransportError> {
        self.simulate_latency().await;
        if peers.is_empty() {
            return Err(TransportError::Failed("no peers given".to_string()));
        }
        self.lock().insert(key.to_string(), value.clone());
        debug!(%key, peers = peers.len(), "loopback replicate");
        Ok(())
    }

    async fn delete_remote(&self, _peers: &[String], key: &str) -> Result<(), TransportError> {
        self.simulate_latency().await;
        self.lock().remove(key);
        Ok(())
    }

    async fn discover_peers(&self) -> Result<Vec<DistributedNode>, TransportError> {
        self.simulate_latency().await;
        Ok(self.peers.clone())
    }
}
