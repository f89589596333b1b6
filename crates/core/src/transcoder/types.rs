//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single transcode request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    /// Source waveform (or any ffmpeg-readable audio).
    pub input_path: PathBuf,
    /// Destination MP3 path.
    pub output_path: PathBuf,
    /// Target bitrate; `None` uses the transcoder's configured bitrate.
    pub bitrate_kbps: Option<u32>,
}

impl TranscodeJob {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        bitrate_kbps: u32,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            bitrate_kbps: Some(bitrate_kbps),
        }
    }
}

/// Result of a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResult {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
}
