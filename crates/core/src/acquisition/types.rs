//! Types for the acquisition module.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::error::AcquisitionError;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    /// Duration in seconds, when the platform reports one.
    pub duration: Option<u64>,
    pub thumbnail: Option<String>,
    pub url: String,
}

/// A request to download the audio of one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub video_id: String,
    /// Used for the output filename.
    pub title: String,
    /// Optional artist subdirectory under the music root.
    #[serde(default)]
    pub artist: Option<String>,
}

impl DownloadRequest {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            artist: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Artist subdirectory (if any) and file stem for the downloaded audio.
    ///
    /// A blank artist means the music root. Any other artist must survive
    /// [`safe_dir_name`]. The title falls back to the video id.
    pub fn output_names(&self) -> Result<(Option<String>, String), AcquisitionError> {
        let artist = match self.artist.as_deref().map(str::trim) {
            Some(artist) if !artist.is_empty() => Some(safe_dir_name(artist).ok_or_else(|| {
                AcquisitionError::invalid(format!("artist '{}' is not a usable name", artist))
            })?),
            _ => None,
        };
        let stem = safe_dir_name(&self.title)
            .or_else(|| safe_dir_name(&self.video_id))
            .ok_or_else(|| AcquisitionError::invalid("title and video_id are not usable names"))?;
        Ok((artist, stem))
    }

    /// Watch URL for the video.
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Download progress as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Percent complete, 0.0 to 100.0.
    pub percent: f32,
}

/// Makes a title safe to use as a file or directory name.
///
/// Removes `<>:"/\|?*`, collapses runs of whitespace and trims.
pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Sanitizes a user-supplied name into a single path component.
///
/// `None` when nothing usable is left: an empty name, or one made only of
/// dots, which would point outside its parent or be hidden from listings.
pub fn safe_dir_name(name: &str) -> Option<String> {
    let safe = sanitize_filename(name);
    if safe.chars().all(|c| c == '.') {
        return None;
    }
    Some(safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Back in Black?"), "ACDC Back in Black");
        assert_eq!(sanitize_filename("  Song   A  "), "Song A");
        assert_eq!(sanitize_filename("a<b>c\"d|e*f\\g"), "abcdefg");
        assert_eq!(sanitize_filename("Tab\tand\nnewline"), "Tab and newline");
    }

    #[test]
    fn test_sanitize_filename_only_forbidden() {
        assert_eq!(sanitize_filename("???"), "");
    }

    #[test]
    fn test_safe_dir_name() {
        assert_eq!(safe_dir_name("AC/DC").as_deref(), Some("ACDC"));
        assert_eq!(safe_dir_name("Mr. Bungle").as_deref(), Some("Mr. Bungle"));
        assert_eq!(safe_dir_name(".."), None);
        assert_eq!(safe_dir_name("."), None);
        assert_eq!(safe_dir_name(" ... "), None);
        assert_eq!(safe_dir_name("/../"), None);
        assert_eq!(safe_dir_name("???"), None);
    }

    #[test]
    fn test_output_names() {
        let req = DownloadRequest::new("vid", "Song: A").with_artist("  ");
        assert_eq!(req.output_names().unwrap(), (None, "Song A".to_string()));

        let req = DownloadRequest::new("vid", "..").with_artist("AC/DC");
        assert_eq!(
            req.output_names().unwrap(),
            (Some("ACDC".to_string()), "vid".to_string())
        );

        let req = DownloadRequest::new("vid", "Song A").with_artist("..");
        assert!(matches!(
            req.output_names(),
            Err(AcquisitionError::InvalidRequest(_))
        ));

        let req = DownloadRequest::new("..", "???");
        assert!(matches!(
            req.output_names(),
            Err(AcquisitionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_download_request_url() {
        let req = DownloadRequest::new("dQw4w9WgXcQ", "Song").with_artist("Rick");
        assert_eq!(req.url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(req.artist.as_deref(), Some("Rick"));
    }
}
