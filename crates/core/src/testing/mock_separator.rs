//! Mock separator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::separator::{
    expected_stems, SeparationError, SeparationOutput, SeparationProgress, SeparationRequest,
    Separator,
};

/// Mock implementation of the Separator trait.
///
/// Writes one small file per expected stem into the request's output
/// directory, sends a few progress updates, and honours cancellation.
///
/// # Example
///
/// ```rust,ignore
/// use stemyard_core::testing::MockSeparator;
///
/// let separator = MockSeparator::new();
/// separator.set_duration(Duration::from_secs(5)).await;
///
/// // Cancel the token while the separation "runs"
/// let result = separator.separate(request, None, token).await;
/// assert!(matches!(result, Err(SeparationError::Cancelled)));
/// ```
#[derive(Debug)]
pub struct MockSeparator {
    requests: Arc<RwLock<Vec<SeparationRequest>>>,
    next_error: Arc<RwLock<Option<SeparationError>>>,
    duration_ms: Arc<RwLock<u64>>,
    /// When false, the output directory is created without stems.
    write_stems: Arc<RwLock<bool>>,
}

impl Default for MockSeparator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSeparator {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            duration_ms: Arc::new(RwLock::new(0)),
            write_stems: Arc::new(RwLock::new(true)),
        }
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<SeparationRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of separations started.
    pub async fn separation_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Configure the next separation to fail with the given error.
    pub async fn set_next_error(&self, error: SeparationError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated separation duration.
    pub async fn set_duration(&self, duration: Duration) {
        *self.duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Produce an empty output directory instead of stems.
    pub async fn set_write_stems(&self, write: bool) {
        *self.write_stems.write().await = write;
    }
}

#[async_trait]
impl Separator for MockSeparator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn separate(
        &self,
        request: SeparationRequest,
        progress_tx: Option<mpsc::Sender<SeparationProgress>>,
        cancel: CancellationToken,
    ) -> Result<SeparationOutput, SeparationError> {
        self.requests.write().await.push(request.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if !request.track_path.exists() {
            return Err(SeparationError::InputNotFound {
                path: request.track_path.clone(),
            });
        }

        let duration_ms = *self.duration_ms.read().await;
        let steps = 4u64;
        for i in 1..=steps {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(duration_ms / steps)) => {}
                _ = cancel.cancelled() => return Err(SeparationError::Cancelled),
            }
            if let Some(ref tx) = progress_tx {
                let _ = tx.try_send(SeparationProgress {
                    percent: (i * 100 / steps) as u8,
                });
            }
        }

        let stem_dir = request.output_dir();
        tokio::fs::create_dir_all(&stem_dir).await?;
        if *self.write_stems.read().await {
            for stem in expected_stems(&request.model) {
                tokio::fs::write(stem_dir.join(format!("{}.mp3", stem)), stem.as_bytes()).await?;
            }
        }

        Ok(SeparationOutput {
            stem_dir,
            scratch_root: request.work_dir,
            model: request.model,
        })
    }

    async fn validate(&self) -> Result<(), SeparationError> {
        Ok(())
    }
}
