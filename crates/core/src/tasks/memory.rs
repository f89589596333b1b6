//! In-memory task store.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::store::{TaskError, TaskPatch, TaskStore};
use super::types::{Task, TaskKind, TaskStatus};
use crate::config::TasksConfig;
use crate::metrics;

/// Mutex-guarded map of task records with TTL and count-bounded retention.
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
    config: TasksConfig,
}

impl InMemoryTaskStore {
    pub fn new(config: TasksConfig) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TasksConfig::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Task>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn prune_locked(&self, tasks: &mut HashMap<String, Task>, now: DateTime<Utc>) -> usize {
        let before = tasks.len();
        let retention = Duration::seconds(self.config.retention_secs.min(i64::MAX as u64) as i64);

        tasks.retain(|_, task| match task.finished_at {
            Some(finished) => now - finished < retention,
            None => true,
        });

        if tasks.len() > self.config.max_retained {
            let mut finished: Vec<(DateTime<Utc>, String)> = tasks
                .values()
                .filter_map(|t| t.finished_at.map(|f| (f, t.id.clone())))
                .collect();
            finished.sort();

            let excess = tasks.len() - self.config.max_retained;
            for (_, id) in finished.into_iter().take(excess) {
                tasks.remove(&id);
            }
        }

        let removed = before - tasks.len();
        if removed > 0 {
            debug!(removed, remaining = tasks.len(), "Pruned finished tasks");
        }
        removed
    }
}

fn apply_patch(task: &mut Task, patch: TaskPatch) -> Result<(), TaskError> {
    if task.is_terminal() {
        return Err(TaskError::AlreadyFinished {
            id: task.id.clone(),
            status: task.status,
        });
    }

    let next = patch.status.unwrap_or(task.status);
    if !task.status.can_transition_to(next) {
        return Err(TaskError::InvalidTransition {
            id: task.id.clone(),
            from: task.status,
            to: next,
        });
    }

    let now = Utc::now();
    task.status = next;
    if let Some(progress) = patch.progress {
        task.progress = task.progress.max(progress.min(100));
    }
    if next == TaskStatus::Completed {
        task.progress = 100;
    }
    if let Some(message) = patch.message {
        task.message = message;
    }
    if let Some(path) = patch.result_path {
        task.result_path = Some(path);
    }
    task.updated_at = now;
    if next.is_terminal() {
        task.finished_at = Some(now);
    }
    Ok(())
}

impl TaskStore for InMemoryTaskStore {
    fn create(&self, id: &str, kind: TaskKind, message: &str) -> Result<Task, TaskError> {
        let mut tasks = self.lock();
        self.prune_locked(&mut tasks, Utc::now());

        if tasks.contains_key(id) {
            return Err(TaskError::Duplicate(id.to_string()));
        }

        let task = Task::new(id, kind, message);
        tasks.insert(id.to_string(), task.clone());
        metrics::TASKS_CREATED.with_label_values(&[kind.as_str()]).inc();
        Ok(task)
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, TaskError> {
        let mut tasks = self.lock();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::Unknown(id.to_string()))?;

        apply_patch(task, patch)?;

        if task.is_terminal() {
            metrics::TASKS_FINISHED
                .with_label_values(&[task.kind.as_str(), task.status.as_str()])
                .inc();
        }
        Ok(task.clone())
    }

    fn get(&self, id: &str) -> Option<Task> {
        self.lock().get(id).cloned()
    }

    fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.lock().values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        tasks
    }

    fn prune(&self) -> usize {
        let mut tasks = self.lock();
        self.prune_locked(&mut tasks, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn store() -> InMemoryTaskStore {
        InMemoryTaskStore::with_defaults()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let task = store.create("t1", TaskKind::Separation, "Queued").unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert_eq!(task.message, "Queued");

        let fetched = store.get("t1").unwrap();
        assert_eq!(fetched, task);
    }

    #[test]
    fn test_create_duplicate() {
        let store = store();
        store.create("t1", TaskKind::Download, "Queued").unwrap();
        let result = store.create("t1", TaskKind::Download, "Queued");
        assert!(matches!(result, Err(TaskError::Duplicate(_))));
    }

    #[test]
    fn test_get_unknown_is_none() {
        assert!(store().get("missing").is_none());
    }

    #[test]
    fn test_update_unknown() {
        let result = store().update("missing", TaskPatch::progress(10));
        assert!(matches!(result, Err(TaskError::Unknown(_))));
    }

    #[test]
    fn test_full_lifecycle() {
        let store = store();
        store.create("t1", TaskKind::Separation, "Queued").unwrap();

        let task = store
            .update("t1", TaskPatch::running(10, "Separating audio"))
            .unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.progress, 10);

        let task = store
            .update("t1", TaskPatch::completed("/stems/Song A", "Done"))
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.result_path, Some(PathBuf::from("/stems/Song A")));
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn test_progress_never_decreases_and_is_clamped() {
        let store = store();
        store.create("t1", TaskKind::Download, "Queued").unwrap();
        store.update("t1", TaskPatch::running(50, "Downloading")).unwrap();

        let task = store.update("t1", TaskPatch::progress(30)).unwrap();
        assert_eq!(task.progress, 50);

        let task = store.update("t1", TaskPatch::progress(250)).unwrap();
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_terminal_rejects_updates() {
        let store = store();
        store.create("t1", TaskKind::Download, "Queued").unwrap();
        store.update("t1", TaskPatch::failed("boom")).unwrap();

        let result = store.update("t1", TaskPatch::running(10, "again"));
        assert!(matches!(result, Err(TaskError::AlreadyFinished { .. })));

        let result = store.update("t1", TaskPatch::progress(90));
        assert!(matches!(result, Err(TaskError::AlreadyFinished { .. })));
        assert_eq!(store.get("t1").unwrap().message, "boom");
    }

    #[test]
    fn test_invalid_transitions() {
        let store = store();
        store.create("t1", TaskKind::Separation, "Queued").unwrap();

        let result = store.update("t1", TaskPatch::completed("/x", "skip"));
        assert!(matches!(result, Err(TaskError::InvalidTransition { .. })));

        store.update("t1", TaskPatch::running(10, "go")).unwrap();
        let result = store.update(
            "t1",
            TaskPatch {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(TaskError::InvalidTransition { .. })));
    }

    #[test]
    fn test_list_newest_first() {
        let store = store();
        store.create("a", TaskKind::Download, "Queued").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.create("b", TaskKind::Separation, "Queued").unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_prune_by_retention_keeps_active() {
        let store = InMemoryTaskStore::new(TasksConfig {
            retention_secs: 0,
            ..Default::default()
        });
        store.create("done", TaskKind::Download, "Queued").unwrap();
        store.update("done", TaskPatch::failed("boom")).unwrap();
        store.create("active", TaskKind::Separation, "Queued").unwrap();

        // create already pruned "done"
        assert!(store.get("done").is_none());
        assert!(store.get("active").is_some());
        assert_eq!(store.prune(), 0);
    }

    #[test]
    fn test_prune_by_count_evicts_oldest_finished() {
        let store = InMemoryTaskStore::new(TasksConfig {
            max_retained: 2,
            ..Default::default()
        });
        for id in ["a", "b", "c"] {
            store.create(id, TaskKind::Download, "Queued").unwrap();
            store.update(id, TaskPatch::failed("boom")).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(store.prune(), 1);
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn test_concurrent_updates() {
        let store = Arc::new(store());
        store.create("t1", TaskKind::Separation, "Queued").unwrap();
        store.update("t1", TaskPatch::running(0, "go")).unwrap();

        let handles: Vec<_> = (1..=50u8)
            .map(|p| {
                let store = store.clone();
                std::thread::spawn(move || store.update("t1", TaskPatch::progress(p)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("t1").unwrap().progress, 50);
    }
}
