//! In-process durable-store stand-in
//!
//! A map behind a mutex with the same cascade and transaction semantics
//! as the file-backed store. Used by tests and the demo wiring.

use async_trait::async_trait;
use hivemind_application::{LocalStore, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Local store backed by process memory
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LocalStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str, cascade: bool) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.remove(key);
        if cascade {
            // Dependents share the key as a prefix, e.g. "user:1" owns "user:1:profile"
            let prefix = format!("{key}:");
            data.retain(|k, _| !k.starts_with(&prefix));
        }
        Ok(())
    }

    async fn apply(&self, entries: &[(String, Value)]) -> Result<(), StoreError> {
        let mut data = self.lock();
        for (key, value) in entries {
            data.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
