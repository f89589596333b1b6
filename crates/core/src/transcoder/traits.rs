//! Trait definitions for the transcoder module.

use async_trait::async_trait;

use super::error::TranscoderError;
use super::types::{TranscodeJob, TranscodeResult};

/// Something that can encode an audio file to MP3.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Encodes `job.input_path` into `job.output_path`.
    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeResult, TranscoderError>;

    /// Validates that the transcoder binary is reachable.
    async fn validate(&self) -> Result<(), TranscoderError>;
}
