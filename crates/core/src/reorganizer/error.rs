//! Error types for the reorganizer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while relocating stems.
#[derive(Debug, Error)]
pub enum ReorganizeError {
    /// The stem directory is missing or holds no stem files.
    #[error("No separated stems found in {path}")]
    MissingOutput { path: PathBuf },

    /// The source track path has no usable file name.
    #[error("Invalid track path: {path}")]
    InvalidTrack { path: PathBuf },

    /// The artist does not form a valid directory name.
    #[error("Invalid artist name: {artist:?}")]
    InvalidArtist { artist: String },

    /// A file already occupies the target path.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Failed to move the stem directory into place.
    #[error("Failed to move {source} to {destination}")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to copy a tree across filesystems.
    #[error("Failed to copy {source} to {destination}")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Encoding a legacy waveform stem failed.
    #[error("Transcode failed: {0}")]
    Transcode(#[from] crate::transcoder::TranscoderError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReorganizeError {
    /// Creates a move failed error.
    pub fn move_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source,
            destination,
            error,
        }
    }

    /// Creates a copy failed error.
    pub fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed {
            source,
            destination,
            error,
        }
    }
}
