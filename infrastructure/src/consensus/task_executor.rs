//! In-process task executor
//!
//! Holds task records in a map and applies bound decisions to them.
//! Registration is explicit; acting on an unknown task is an error the
//! engine reports but does not retry.

use async_trait::async_trait;
use hivemind_application::{TaskError, TaskExecutor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// A task as this executor tracks it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub status: String,
    pub definition: serde_json::Value,
}

/// Task executor backed by process memory
#[derive(Default)]
pub struct InMemoryTaskExecutor {
    tasks: Mutex<HashMap<String, TaskRecord>>,
}

impl InMemoryTaskExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task so decisions can be applied to it
    pub fn register(&self, id: impl Into<String>, definition: serde_json::Value) {
        let id = id.into();
        self.lock().insert(
            id.clone(),
            TaskRecord {
                id,
                status: "pending".to_string(),
                definition,
            },
        );
    }

    /// Snapshot a task record
    pub fn task(&self, id: &str) -> Option<TaskRecord> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TaskRecord>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskExecutor for InMemoryTaskExecutor {
    async fn set_task_status(&self, task_id: &str, status: &str) -> Result<(), TaskError> {
        let mut tasks = self.lock();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        task.status = status.to_string();
        info!(%task_id, %status, "task status updated");
        Ok(())
    }

    async fn apply_task_modification(
        &self,
        task_id: &str,
        patch: &serde_json::Value,
    ) -> Result<(), TaskError> {
        let mut tasks = self.lock();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;

        // Shallow merge: patch fields win over existing ones
        match (&mut task.definition, patch) {
            (serde_json::Value::Object(base), serde_json::Value::Object(changes)) => {
                for (key, value) in changes {
                    base.insert(key.clone(), value.clone());
                }
            }
            (definition, _) => *definition = patch.clone(),
        }
        task.status = "modified".to_string();
        info!(%task_id, "task definition patched");
        Ok(())
    }
}
