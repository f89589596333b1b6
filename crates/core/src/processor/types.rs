//! Types for the processor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::separator::SeparatorConfig;

/// Status of the job pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of jobs holding a permit.
    pub active_jobs: usize,
    /// Maximum concurrent jobs.
    pub max_concurrent: usize,
    /// Number of jobs waiting for a permit.
    pub queued_jobs: usize,
    /// Total jobs finished successfully since startup.
    pub total_processed: u64,
    /// Total jobs failed since startup.
    pub total_failed: u64,
}

/// A request to separate one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationJob {
    pub track_path: PathBuf,
    /// Model override; the configured default when `None`.
    #[serde(default)]
    pub model: Option<String>,
    /// Device override; the configured default when `None`.
    #[serde(default)]
    pub device: Option<String>,
    /// Group the stems under the separated root by artist.
    #[serde(default)]
    pub artist: Option<String>,
}

impl SeparationJob {
    pub fn new(track_path: impl Into<PathBuf>) -> Self {
        Self {
            track_path: track_path.into(),
            model: None,
            device: None,
            artist: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_artist(mut self, artist: Option<String>) -> Self {
        self.artist = artist;
        self
    }
}

/// Separation settings used when a job does not override them.
#[derive(Debug, Clone)]
pub struct SeparationDefaults {
    pub model: String,
    pub device: String,
    /// Root for per-task scratch directories.
    pub work_dir: PathBuf,
}

impl From<&SeparatorConfig> for SeparationDefaults {
    fn from(config: &SeparatorConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            device: config.device.clone(),
            work_dir: config.work_dir.clone(),
        }
    }
}
