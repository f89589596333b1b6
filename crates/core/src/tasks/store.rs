//! Task storage trait and types.

use std::path::PathBuf;
use thiserror::Error;

use super::types::{Task, TaskKind, TaskStatus};

/// Error type for task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task already exists: {0}")]
    Duplicate(String),

    #[error("Task not found: {0}")]
    Unknown(String),

    #[error("Task {id} already finished with status {status}")]
    AlreadyFinished { id: String, status: TaskStatus },

    #[error("Task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Partial update merged into a task. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub result_path: Option<PathBuf>,
}

impl TaskPatch {
    pub fn running(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Running),
            progress: Some(progress),
            message: Some(message.into()),
            result_path: None,
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn completed(result_path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            progress: Some(100),
            message: Some(message.into()),
            result_path: Some(result_path.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Trait for task storage backends.
pub trait TaskStore: Send + Sync {
    /// Create a pending task. Also evicts expired tasks.
    fn create(&self, id: &str, kind: TaskKind, message: &str) -> Result<Task, TaskError>;

    /// Merge a patch into a task and return the updated record.
    fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, TaskError>;

    /// Get a task by id. `None` when unknown or already evicted.
    fn get(&self, id: &str) -> Option<Task>;

    /// All retained tasks, newest first.
    fn list(&self) -> Vec<Task>;

    /// Evict terminal tasks past retention or over capacity. Returns the
    /// number removed.
    fn prune(&self) -> usize;
}
