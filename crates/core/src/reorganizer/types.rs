//! Types for the reorganizer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A request to install one separation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationJob {
    /// Directory holding the freshly separated stems.
    pub stem_dir: PathBuf,
    /// Source track the stems were separated from.
    pub track_path: PathBuf,
    /// Group the stems under `<separated_dir>/<artist>/` when set.
    pub artist: Option<String>,
    /// Per-job scratch tree removed after relocation, whatever the outcome.
    pub scratch_root: Option<PathBuf>,
}

impl RelocationJob {
    pub fn new(stem_dir: impl Into<PathBuf>, track_path: impl Into<PathBuf>) -> Self {
        Self {
            stem_dir: stem_dir.into(),
            track_path: track_path.into(),
            artist: None,
            scratch_root: None,
        }
    }

    pub fn with_artist(mut self, artist: Option<String>) -> Self {
        self.artist = artist;
        self
    }

    pub fn with_scratch_root(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(scratch_root.into());
        self
    }
}

/// Outcome of a successful relocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationResult {
    /// Final stem directory.
    pub destination: PathBuf,
    /// Installed stem files, sorted.
    pub stems: Vec<PathBuf>,
    /// Whether a previous stem set was replaced.
    pub replaced: bool,
}

/// A song that could not be migrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationFailure {
    pub song: String,
    pub error: String,
}

/// Summary of a legacy layout migration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Stem directories written next to their source tracks.
    pub migrated: Vec<PathBuf>,
    /// Songs skipped because no source track exists or they were already migrated.
    pub skipped: Vec<String>,
    pub failed: Vec<MigrationFailure>,
}
