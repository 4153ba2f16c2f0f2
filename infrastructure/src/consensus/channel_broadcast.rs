//! Broadcast adapter over a tokio broadcast channel
//!
//! In-process agents subscribe to the channel and filter on `swarm_id`.
//! Delivery is fire-and-forget; a channel with no subscribers is fine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hivemind_application::{BroadcastError, SwarmBroadcast};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A message delivered to every agent in a swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmMessage {
    pub swarm_id: String,
    pub message_type: String,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

/// Swarm broadcast backed by a tokio broadcast channel
pub struct ChannelBroadcast {
    sender: broadcast::Sender<SwarmMessage>,
}

impl ChannelBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all swarm messages; filter on `swarm_id` at the receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SwarmMessage> {
        self.sender.subscribe()
    }
}

impl Default for ChannelBroadcast {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl SwarmBroadcast for ChannelBroadcast {
    async fn broadcast(
        &self,
        swarm_id: &str,
        message_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), BroadcastError> {
        let message = SwarmMessage {
            swarm_id: swarm_id.to_string(),
            message_type: message_type.to_string(),
            payload,
            sent_at: Utc::now(),
        };
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(%swarm_id, %message_type, receivers, "swarm message sent");
            }
            Err(_) => {
                // Nobody listening; fire-and-forget means this is not an error
                debug!(%swarm_id, %message_type, "swarm message dropped, no subscribers");
            }
        }
        Ok(())
    }
}
