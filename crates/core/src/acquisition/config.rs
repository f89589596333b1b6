//! Configuration for the acquisition module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp acquirer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcquisitionConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Directory (or binary) handed to yt-dlp as `--ffmpeg-location`.
    #[serde(default)]
    pub ffmpeg_location: Option<PathBuf>,

    /// yt-dlp `--audio-quality` value (VBR 0-9 or a bitrate such as "192").
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Timeout for a single search or download in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_audio_quality() -> String {
    "192".to_string()
}

fn default_timeout() -> u64 {
    1800
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_location: None,
            audio_quality: default_audio_quality(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AcquisitionConfig {
    pub fn with_ytdlp_path(mut self, path: PathBuf) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
