//! Mock acquirer for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::acquisition::{
    AcquisitionError, Acquirer, DownloadProgress, DownloadRequest, VideoSummary,
};

/// Mock implementation of the Acquirer trait.
///
/// Search returns the configured results; download writes a small file at
/// the same path yt-dlp would use under `music_dir`.
#[derive(Debug)]
pub struct MockAcquirer {
    music_dir: PathBuf,
    results: Arc<RwLock<Vec<VideoSummary>>>,
    downloads: Arc<RwLock<Vec<DownloadRequest>>>,
    searches: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<AcquisitionError>>>,
    duration_ms: Arc<RwLock<u64>>,
}

impl MockAcquirer {
    pub fn new(music_dir: impl Into<PathBuf>) -> Self {
        Self {
            music_dir: music_dir.into(),
            results: Arc::new(RwLock::new(Vec::new())),
            downloads: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            duration_ms: Arc::new(RwLock::new(0)),
        }
    }

    /// Set the results returned by every search.
    pub async fn set_results(&self, results: Vec<VideoSummary>) {
        *self.results.write().await = results;
    }

    /// Get all recorded download requests.
    pub async fn recorded_downloads(&self) -> Vec<DownloadRequest> {
        self.downloads.read().await.clone()
    }

    /// Get all recorded search queries.
    pub async fn recorded_searches(&self) -> Vec<String> {
        self.searches.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: AcquisitionError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated download duration.
    pub async fn set_duration(&self, duration: Duration) {
        *self.duration_ms.write().await = duration.as_millis() as u64;
    }
}

#[async_trait]
impl Acquirer for MockAcquirer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<VideoSummary>, AcquisitionError> {
        self.searches.write().await.push(query.to_string());
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if query.trim().is_empty() {
            return Err(AcquisitionError::invalid("query must not be empty"));
        }
        Ok(self.results.read().await.iter().take(limit).cloned().collect())
    }

    async fn download(
        &self,
        request: DownloadRequest,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<PathBuf, AcquisitionError> {
        self.downloads.write().await.push(request.clone());
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let duration_ms = *self.duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }
        if let Some(tx) = progress_tx {
            let _ = tx.try_send(DownloadProgress { percent: 100.0 });
        }

        let (artist, stem) = request.output_names()?;
        let dir = match artist {
            Some(artist) => self.music_dir.join(artist),
            None => self.music_dir.clone(),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.mp3", stem));
        tokio::fs::write(&path, request.video_id.as_bytes()).await?;
        Ok(path)
    }

    async fn validate(&self) -> Result<(), AcquisitionError> {
        Ok(())
    }
}
