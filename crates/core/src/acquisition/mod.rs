//! Acquisition of audio from a video platform.
//!
//! The `Acquirer` trait covers searching for a track and downloading its
//! audio into the music library. `YtDlpAcquirer` drives the `yt-dlp` CLI.

mod config;
mod error;
mod traits;
mod types;
mod ytdlp;

pub use config::AcquisitionConfig;
pub use error::AcquisitionError;
pub use traits::Acquirer;
pub use types::{
    safe_dir_name, sanitize_filename, DownloadProgress, DownloadRequest, VideoSummary,
};
pub use ytdlp::YtDlpAcquirer;
