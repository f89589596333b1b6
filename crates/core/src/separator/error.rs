//! Error types for the separator module.

use std::path::PathBuf;
use thiserror::Error;

use crate::transcoder::TranscoderError;

/// Errors that can occur while separating a track.
#[derive(Debug, Error)]
pub enum SeparationError {
    /// Separation binary not found.
    #[error("Separator binary not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Input track not found.
    #[error("Input track not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The model process exited unsuccessfully.
    #[error("Separation process failed ({code:?}): {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    /// The process reported success but the expected directory is absent.
    #[error("Separation output not found: {path}")]
    MissingOutput { path: PathBuf },

    /// Encoding a waveform stem to MP3 failed.
    #[error("Failed to encode stem: {0}")]
    Encode(#[from] TranscoderError),

    /// Separation timed out.
    #[error("Separation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Separation was cancelled by the caller.
    #[error("Separation cancelled")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
