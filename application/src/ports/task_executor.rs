//! Task execution port

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while acting on a task
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task execution failed: {0}")]
    Failed(String),
}

/// Applies a bound decision to the task a proposal references
///
/// Invoked only when an achieved proposal carries a `task_id`.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Set the task's status (e.g. "approved", "cancelled")
    async fn set_task_status(&self, task_id: &str, status: &str) -> Result<(), TaskError>;

    /// Patch the task definition before it runs
    async fn apply_task_modification(
        &self,
        task_id: &str,
        patch: &serde_json::Value,
    ) -> Result<(), TaskError>;
}
