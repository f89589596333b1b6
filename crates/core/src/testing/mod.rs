//! Testing utilities and mock implementations.
//!
//! Mock versions of the external tool adapters so the processor, the
//! reorganizer and the HTTP layer can be exercised without yt-dlp, demucs or
//! ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use stemyard_core::testing::{MockAcquirer, MockSeparator, MockTranscoder};
//!
//! let acquirer = MockAcquirer::new("music");
//! acquirer.set_results(vec![fixtures::video("abc123", "High and Dry")]).await;
//!
//! let separator = MockSeparator::new();
//! separator.set_duration(Duration::from_millis(200)).await;
//! ```

mod mock_acquirer;
mod mock_separator;
mod mock_transcoder;

pub use mock_acquirer::MockAcquirer;
pub use mock_separator::MockSeparator;
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::acquisition::VideoSummary;

    /// Create a search hit with reasonable defaults.
    pub fn video(video_id: &str, title: &str) -> VideoSummary {
        VideoSummary {
            video_id: video_id.to_string(),
            title: title.to_string(),
            channel: "Mock Channel".to_string(),
            duration: Some(215),
            thumbnail: Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)),
            url: format!("https://www.youtube.com/watch?v={}", video_id),
        }
    }

    /// Write a fake track at `<music_dir>[/<artist>]/<title>.mp3`.
    pub fn track(music_dir: &Path, artist: Option<&str>, title: &str) -> PathBuf {
        let dir = match artist {
            Some(artist) => music_dir.join(artist),
            None => music_dir.to_path_buf(),
        };
        std::fs::create_dir_all(&dir).expect("create track dir");
        let path = dir.join(format!("{}.mp3", title));
        std::fs::write(&path, b"fake mp3 data").expect("write track");
        path
    }

    /// Write stem files into `dir`.
    pub fn stems(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        std::fs::create_dir_all(dir).expect("create stem dir");
        names
            .iter()
            .map(|name| {
                let path = dir.join(format!("{}.mp3", name));
                std::fs::write(&path, name.as_bytes()).expect("write stem");
                path
            })
            .collect()
    }
}
