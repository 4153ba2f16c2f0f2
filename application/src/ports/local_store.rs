//! Durable local store port

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during durable-store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store failure: {0}")]
    Storage(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),
}

/// Durable local key-value collaborator
///
/// Values arrive already encoded: a compressed value is a marker-tagged
/// string the store treats as opaque. Absence is `Ok(None)`, not an error.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn put(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError>;

    /// Remove a key; with `cascade` also remove dependent keys
    /// (which keys count as dependent is this store's policy)
    async fn delete(&self, key: &str, cascade: bool) -> Result<(), StoreError>;

    /// Apply a batch of writes as one all-or-nothing transaction
    async fn apply(&self, entries: &[(String, serde_json::Value)]) -> Result<(), StoreError>;
}
