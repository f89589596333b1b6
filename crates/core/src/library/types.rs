//! Types for the library module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Artist attributed to tracks stored directly under the music root.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Extension of downloaded tracks and finished stems. yt-dlp extracts to it
/// and both encoders in the pipeline write it.
pub const AUDIO_EXTENSION: &str = "mp3";

/// A committed audio file in the music tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// File name without extension.
    pub id: String,
    pub title: String,
    pub artist: String,
    pub file_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Stem files produced for one track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemSet {
    pub song_id: String,
    pub output_dir: Option<PathBuf>,
    /// Stem name (file stem, e.g. `vocals`) to file path.
    pub stems: BTreeMap<String, PathBuf>,
}

impl StemSet {
    /// The "nothing found" value.
    pub fn empty(song_id: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            output_dir: None,
            stems: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}

/// Aggregate library statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_songs: usize,
    /// Distinct artists, not counting the unknown artist.
    pub total_artists: usize,
    pub total_separated: usize,
    pub total_size_mb: f64,
}
