//! Mock transcoder for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transcoder::{TranscodeJob, TranscodeResult, Transcoder, TranscoderError};

/// Mock implementation of the Transcoder trait.
///
/// Copies the input bytes to the output path so callers see a real file,
/// and records every job.
#[derive(Debug, Default)]
pub struct MockTranscoder {
    jobs: Arc<RwLock<Vec<TranscodeJob>>>,
    next_error: Arc<RwLock<Option<TranscoderError>>>,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded jobs.
    pub async fn recorded_jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.read().await.clone()
    }

    /// Get the number of transcodes performed.
    pub async fn transcode_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Configure the next transcode to fail with the given error.
    pub async fn set_next_error(&self, error: TranscoderError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeResult, TranscoderError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let bytes = tokio::fs::read(&job.input_path).await.map_err(|_| {
            TranscoderError::InputNotFound {
                path: job.input_path.clone(),
            }
        })?;
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&job.output_path, &bytes).await?;

        self.jobs.write().await.push(job.clone());

        Ok(TranscodeResult {
            output_path: job.output_path,
            output_size_bytes: bytes.len() as u64,
            duration_ms: 0,
        })
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        Ok(())
    }
}
