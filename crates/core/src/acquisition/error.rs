//! Error types for the acquisition module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("yt-dlp not found at {path}")]
    BinaryNotFound { path: PathBuf },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("yt-dlp exited with code {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("failed to parse yt-dlp output: {0}")]
    Parse(String),

    #[error("download finished but no file at {path}")]
    OutputMissing { path: PathBuf },

    #[error("yt-dlp timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}
