//! Swarm broadcast port

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while notifying a swarm
#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Broadcast failed: {0}")]
    Failed(String),
}

/// Fire-and-forget notification to every agent in a swarm
///
/// Used for voting requests and result announcements. Delivery is
/// best-effort; the engine never waits for acknowledgements.
#[async_trait]
pub trait SwarmBroadcast: Send + Sync {
    async fn broadcast(
        &self,
        swarm_id: &str,
        message_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), BroadcastError>;
}
