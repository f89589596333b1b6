//! Configuration for the separator module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::SIX_STEM_MODEL;

/// Configuration for the demucs-based separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorConfig {
    /// Path to the demucs binary.
    #[serde(default = "default_demucs_path")]
    pub demucs_path: PathBuf,

    /// Model used when a request does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Execution device: cpu, cuda, cuda:N or mps.
    #[serde(default = "default_device")]
    pub device: String,

    /// Let demucs write MP3 itself. When false, demucs writes WAV and each
    /// stem is encoded through the transcoder.
    #[serde(default = "default_mp3_output")]
    pub mp3_output: bool,

    /// Bitrate for MP3 stems in kbps.
    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate_kbps: u32,

    /// Root for per-job scratch directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Timeout for a single separation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional arguments passed to demucs before the input file.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_demucs_path() -> PathBuf {
    PathBuf::from("demucs")
}

fn default_model() -> String {
    SIX_STEM_MODEL.to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_mp3_output() -> bool {
    true
}

fn default_mp3_bitrate() -> u32 {
    320
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("stemyard-separator")
}

fn default_timeout() -> u64 {
    7200 // 2 hours, CPU separation of long tracks is slow
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            demucs_path: default_demucs_path(),
            default_model: default_model(),
            device: default_device(),
            mp3_output: default_mp3_output(),
            mp3_bitrate_kbps: default_mp3_bitrate(),
            work_dir: default_work_dir(),
            timeout_secs: default_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl SeparatorConfig {
    /// Sets the scratch root.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Sets the demucs binary path.
    pub fn with_demucs_path(mut self, demucs_path: PathBuf) -> Self {
        self.demucs_path = demucs_path;
        self
    }
}
