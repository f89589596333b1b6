//! Job processor implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::acquisition::{AcquisitionError, Acquirer, DownloadProgress, DownloadRequest};
use crate::metrics;
use crate::reorganizer::{RelocationJob, Reorganizer};
use crate::separator::{SeparationError, SeparationProgress, SeparationRequest, Separator};
use crate::tasks::{Task, TaskError, TaskKind, TaskPatch, TaskStatus, TaskStore};

use super::config::ProcessorConfig;
use super::types::{PoolStatus, SeparationDefaults, SeparationJob};

/// Message recorded on tasks ended by `cancel`.
pub const CANCELLED_MESSAGE: &str = "Cancelled";

/// Error type for processor operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The track to separate does not exist.
    #[error("Track not found: {path}")]
    TrackNotFound { path: PathBuf },

    /// Task bookkeeping failed.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The task is unknown or already finished.
    #[error("Task {task_id} cannot be cancelled: {reason}")]
    NotCancellable { task_id: String, reason: String },

    /// Download failed.
    #[error("Download failed: {source}")]
    Download {
        task_id: String,
        #[source]
        source: AcquisitionError,
    },

    /// The task was cancelled before it finished.
    #[error("Task {task_id} was cancelled")]
    Cancelled { task_id: String },
}

/// Tracks statistics for the job pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn to_status(&self, max_concurrent: usize) -> PoolStatus {
        PoolStatus {
            active_jobs: self.active.load(Ordering::Relaxed) as usize,
            max_concurrent,
            queued_jobs: self.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, success: bool) {
        if success {
            self.total_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A held pool slot. Releasing it updates the active counters.
struct ActiveSlot {
    _permit: OwnedSemaphorePermit,
    stats: Arc<PoolStats>,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::Relaxed);
        metrics::ACTIVE_JOBS.dec();
    }
}

/// Runs downloads and separations as tracked tasks on a bounded pool.
#[derive(Clone)]
pub struct Processor {
    config: ProcessorConfig,
    defaults: SeparationDefaults,
    tasks: Arc<dyn TaskStore>,
    acquirer: Arc<dyn Acquirer>,
    separator: Arc<dyn Separator>,
    reorganizer: Arc<Reorganizer>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    cancellations: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl Processor {
    /// Creates a new processor.
    pub fn new(
        config: ProcessorConfig,
        defaults: SeparationDefaults,
        tasks: Arc<dyn TaskStore>,
        acquirer: Arc<dyn Acquirer>,
        separator: Arc<dyn Separator>,
        reorganizer: Arc<Reorganizer>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs.max(1)));
        Self {
            config,
            defaults,
            tasks,
            acquirer,
            separator,
            reorganizer,
            semaphore,
            stats: Arc::new(PoolStats::default()),
            cancellations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn tasks(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    pub fn acquirer(&self) -> &Arc<dyn Acquirer> {
        &self.acquirer
    }

    pub fn reorganizer(&self) -> &Arc<Reorganizer> {
        &self.reorganizer
    }

    pub fn defaults(&self) -> &SeparationDefaults {
        &self.defaults
    }

    /// Returns the current pool status.
    pub fn status(&self) -> PoolStatus {
        self.stats.to_status(self.config.max_parallel_jobs.max(1))
    }

    /// Queues a separation and returns its task id immediately.
    pub fn submit_separation(&self, job: SeparationJob) -> Result<String, ProcessorError> {
        let (task_id, token) = self.start_task(TaskKind::Separation, Some(&job.track_path))?;

        let this = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            this.run_separation(id, job, token).await;
        });

        Ok(task_id)
    }

    /// Separates a track on the current task and returns the final task record.
    pub async fn separate(&self, job: SeparationJob) -> Result<Task, ProcessorError> {
        let (task_id, token) = self.start_task(TaskKind::Separation, Some(&job.track_path))?;
        self.run_separation(task_id.clone(), job, token).await;
        self.tasks
            .get(&task_id)
            .ok_or_else(|| ProcessorError::Task(TaskError::Unknown(task_id)))
    }

    /// Downloads on the current task. The download is still tracked as a task.
    pub async fn download(
        &self,
        request: DownloadRequest,
    ) -> Result<(String, PathBuf), ProcessorError> {
        let (task_id, token) = self.start_task(TaskKind::Download, None)?;
        let path = self.run_download(task_id.clone(), request, token).await?;
        Ok((task_id, path))
    }

    /// Queues a download and returns its task id immediately.
    pub fn submit_download(&self, request: DownloadRequest) -> Result<String, ProcessorError> {
        let (task_id, token) = self.start_task(TaskKind::Download, None)?;

        let this = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run_download(id.clone(), request, token).await {
                debug!(task_id = %id, error = %e, "Background download ended with error");
            }
        });

        Ok(task_id)
    }

    /// Cancels a pending or running task. The task ends `failed` with
    /// message "Cancelled" once its worker notices.
    pub fn cancel(&self, task_id: &str) -> Result<(), ProcessorError> {
        let not_cancellable = |reason: &str| ProcessorError::NotCancellable {
            task_id: task_id.to_string(),
            reason: reason.to_string(),
        };

        let task = self.tasks.get(task_id).ok_or_else(|| not_cancellable("unknown task"))?;
        if task.is_terminal() {
            return Err(not_cancellable("task already finished"));
        }

        let token = self
            .lock_cancellations()
            .get(task_id)
            .cloned()
            .ok_or_else(|| not_cancellable("task is not owned by this processor"))?;

        info!(task_id, "Cancelling task");
        token.cancel();
        Ok(())
    }

    fn lock_cancellations(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.cancellations.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start_task(
        &self,
        kind: TaskKind,
        track_path: Option<&Path>,
    ) -> Result<(String, CancellationToken), ProcessorError> {
        if let Some(path) = track_path {
            if !path.is_file() {
                return Err(ProcessorError::TrackNotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        let task_id = kind.new_task_id();
        self.tasks.create(&task_id, kind, "Queued")?;

        let token = CancellationToken::new();
        self.lock_cancellations()
            .insert(task_id.clone(), token.clone());
        self.stats.queued.fetch_add(1, Ordering::Relaxed);

        debug!(task_id = %task_id, kind = %kind, "Task queued");
        Ok((task_id, token))
    }

    /// Waits for a pool slot; `None` when cancelled first.
    async fn acquire_slot(&self, token: &CancellationToken) -> Option<ActiveSlot> {
        let permit = tokio::select! {
            permit = self.semaphore.clone().acquire_owned() => permit.ok(),
            _ = token.cancelled() => None,
        };
        self.stats.queued.fetch_sub(1, Ordering::Relaxed);

        let permit = permit?;
        self.stats.active.fetch_add(1, Ordering::Relaxed);
        metrics::ACTIVE_JOBS.inc();
        Some(ActiveSlot {
            _permit: permit,
            stats: self.stats.clone(),
        })
    }

    fn finish(&self, task_id: &str, patch: TaskPatch) {
        let success = patch.status == Some(TaskStatus::Completed);
        self.stats.record(success);
        self.lock_cancellations().remove(task_id);

        if let Err(e) = self.tasks.update(task_id, patch) {
            warn!(task_id, error = %e, "Failed to record task outcome");
        }
    }

    fn set_progress(&self, task_id: &str, patch: TaskPatch) {
        if let Err(e) = self.tasks.update(task_id, patch) {
            debug!(task_id, error = %e, "Progress update rejected");
        }
    }

    async fn run_separation(&self, task_id: String, job: SeparationJob, token: CancellationToken) {
        let Some(_slot) = self.acquire_slot(&token).await else {
            self.finish(&task_id, TaskPatch::failed(CANCELLED_MESSAGE));
            return;
        };

        self.set_progress(&task_id, TaskPatch::running(10, "Separating audio"));

        let model = job.model.clone().unwrap_or_else(|| self.defaults.model.clone());
        let request = SeparationRequest {
            track_path: job.track_path.clone(),
            model: model.clone(),
            device: job.device.clone().unwrap_or_else(|| self.defaults.device.clone()),
            work_dir: self.defaults.work_dir.join(&task_id),
        };
        let scratch = request.work_dir.clone();

        info!(
            task_id = %task_id,
            track = %job.track_path.display(),
            model = %model,
            "Separation started"
        );

        let (progress_tx, mut progress_rx) = mpsc::channel::<SeparationProgress>(32);
        let forwarder = {
            let tasks = self.tasks.clone();
            let id = task_id.clone();
            tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    let mapped = 10 + (progress.percent.min(100) as u32 * 70 / 100) as u8;
                    let _ = tasks.update(&id, TaskPatch::progress(mapped));
                }
            })
        };

        let start = Instant::now();
        let result = self
            .separator
            .separate(request, Some(progress_tx), token.clone())
            .await;
        forwarder.abort();

        metrics::SEPARATION_DURATION
            .with_label_values(&[model.as_str(), if result.is_ok() { "success" } else { "failed" }])
            .observe(start.elapsed().as_secs_f64());

        let output = match result {
            Ok(output) if !token.is_cancelled() => output,
            Ok(_) | Err(SeparationError::Cancelled) => {
                remove_scratch(&scratch).await;
                info!(task_id = %task_id, "Separation cancelled");
                self.finish(&task_id, TaskPatch::failed(CANCELLED_MESSAGE));
                return;
            }
            Err(e) => {
                remove_scratch(&scratch).await;
                error!(task_id = %task_id, error = %e, "Separation failed");
                self.finish(&task_id, TaskPatch::failed(format!("Separation failed: {}", e)));
                return;
            }
        };

        self.set_progress(&task_id, TaskPatch::running(80, "Organizing files"));

        let relocation = RelocationJob::new(&output.stem_dir, &job.track_path)
            .with_artist(job.artist.clone())
            .with_scratch_root(&output.scratch_root);

        match self.reorganizer.relocate(relocation).await {
            Ok(result) => {
                info!(
                    task_id = %task_id,
                    destination = %result.destination.display(),
                    "Separation completed"
                );
                self.finish(
                    &task_id,
                    TaskPatch::completed(result.destination, "Separation completed"),
                );
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "Organizing stems failed");
                self.finish(
                    &task_id,
                    TaskPatch::failed(format!("Organizing files failed: {}", e)),
                );
            }
        }
    }

    async fn run_download(
        &self,
        task_id: String,
        request: DownloadRequest,
        token: CancellationToken,
    ) -> Result<PathBuf, ProcessorError> {
        let Some(_slot) = self.acquire_slot(&token).await else {
            self.finish(&task_id, TaskPatch::failed(CANCELLED_MESSAGE));
            return Err(ProcessorError::Cancelled { task_id });
        };

        self.set_progress(&task_id, TaskPatch::running(0, "Downloading"));
        info!(task_id = %task_id, video_id = %request.video_id, "Download started");

        let (progress_tx, mut progress_rx) = mpsc::channel::<DownloadProgress>(32);
        let forwarder = {
            let tasks = self.tasks.clone();
            let id = task_id.clone();
            tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    // leave headroom for post-processing after the raw download
                    let mapped = (progress.percent.clamp(0.0, 100.0) * 0.95) as u8;
                    let _ = tasks.update(&id, TaskPatch::progress(mapped));
                }
            })
        };

        let start = Instant::now();
        // Dropping the download future kills yt-dlp.
        let result = tokio::select! {
            result = self.acquirer.download(request, Some(progress_tx)) => Some(result),
            _ = token.cancelled() => None,
        };
        forwarder.abort();

        let label = match &result {
            Some(Ok(_)) => "success",
            Some(Err(_)) => "failed",
            None => "cancelled",
        };
        metrics::DOWNLOAD_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Some(Ok(path)) => {
                info!(task_id = %task_id, path = %path.display(), "Download completed");
                self.finish(&task_id, TaskPatch::completed(&path, "Download completed"));
                Ok(path)
            }
            Some(Err(e)) => {
                error!(task_id = %task_id, error = %e, "Download failed");
                self.finish(&task_id, TaskPatch::failed(format!("Download failed: {}", e)));
                Err(ProcessorError::Download { task_id, source: e })
            }
            None => {
                info!(task_id = %task_id, "Download cancelled");
                self.finish(&task_id, TaskPatch::failed(CANCELLED_MESSAGE));
                Err(ProcessorError::Cancelled { task_id })
            }
        }
    }
}

async fn remove_scratch(scratch: &Path) {
    match tokio::fs::remove_dir_all(scratch).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %scratch.display(), error = %e, "Failed to remove scratch"),
    }
}
