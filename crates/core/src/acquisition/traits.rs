//! Trait definitions for the acquisition module.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::error::AcquisitionError;
use super::types::{DownloadProgress, DownloadRequest, VideoSummary};

/// Searches a video platform and downloads audio into the library.
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Returns the name of this acquirer implementation.
    fn name(&self) -> &str;

    /// Searches for videos matching `query`, returning at most `limit` hits.
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<VideoSummary>, AcquisitionError>;

    /// Downloads the audio of one video and returns the committed file path.
    async fn download(
        &self,
        request: DownloadRequest,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<PathBuf, AcquisitionError>;

    /// Validates that the backend binary is reachable.
    async fn validate(&self) -> Result<(), AcquisitionError>;
}
