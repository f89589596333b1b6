//! Task API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use stemyard_core::{Task, TaskKind, TaskStatus};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a single task. The result path is reported as `output_dir`
/// for separations and `file_path` for downloads.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let (output_dir, file_path) = match task.kind {
            TaskKind::Separation => (task.result_path, None),
            TaskKind::Download => (None, task.result_path),
        };
        Self {
            task_id: task.id,
            kind: task.kind,
            status: task.status,
            progress: task.progress,
            message: task.message,
            output_dir,
            file_path,
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
            finished_at: task.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub success: bool,
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct CancelTaskResponse {
    pub success: bool,
    pub task_id: String,
}

/// Get a task by id
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    state
        .tasks()
        .get(&id)
        .map(|task| Json(task.into()))
        .ok_or_else(|| ApiError::not_found(format!("Task not found: {}", id)))
}

/// List retained tasks, newest first
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<ListTasksResponse> {
    let tasks = state.tasks().list().into_iter().map(Into::into).collect();
    Json(ListTasksResponse {
        success: true,
        tasks,
    })
}

/// Cancel a pending or running task
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelTaskResponse>> {
    if state.tasks().get(&id).is_none() {
        return Err(ApiError::not_found(format!("Task not found: {}", id)));
    }

    state.processor().cancel(&id)?;
    Ok(Json(CancelTaskResponse {
        success: true,
        task_id: id,
    }))
}
