//! yt-dlp backed acquirer.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

use super::config::AcquisitionConfig;
use super::error::AcquisitionError;
use super::traits::Acquirer;
use super::types::{DownloadProgress, DownloadRequest, VideoSummary};
use crate::library::AUDIO_EXTENSION;

static DOWNLOAD_PROGRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("download progress regex is valid")
});

/// Acquirer that shells out to yt-dlp.
pub struct YtDlpAcquirer {
    config: AcquisitionConfig,
    music_dir: PathBuf,
}

impl YtDlpAcquirer {
    /// Creates an acquirer writing into `music_dir`.
    pub fn new(config: AcquisitionConfig, music_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            music_dir: music_dir.into(),
        }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Directory a request downloads into.
    pub fn target_dir(&self, request: &DownloadRequest) -> Result<PathBuf, AcquisitionError> {
        let (artist, _) = request.output_names()?;
        Ok(match artist {
            Some(artist) => self.music_dir.join(artist),
            None => self.music_dir.clone(),
        })
    }

    fn build_search_args(query: &str, limit: usize) -> Vec<String> {
        vec![
            "--flat-playlist".to_string(),
            "-J".to_string(),
            "--no-warnings".to_string(),
            format!("ytsearch{}:{}", limit, query),
        ]
    }

    fn build_download_args(&self, output_template: &Path, url: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            AUDIO_EXTENSION.to_string(),
            "--audio-quality".to_string(),
            self.config.audio_quality.clone(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
        ];

        if let Some(ref location) = self.config.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().to_string());
        }

        args.push(url.to_string());
        args
    }

    fn map_spawn_error(&self, e: std::io::Error) -> AcquisitionError {
        if e.kind() == std::io::ErrorKind::NotFound {
            AcquisitionError::BinaryNotFound {
                path: self.config.ytdlp_path.clone(),
            }
        } else {
            AcquisitionError::Io(e)
        }
    }
}

/// Parses `yt-dlp -J` output of a `ytsearchN:` query.
fn parse_search_results(json: &str) -> Result<Vec<VideoSummary>, AcquisitionError> {
    let root: Value =
        serde_json::from_str(json).map_err(|e| AcquisitionError::Parse(e.to_string()))?;

    let entries = root
        .get("entries")
        .and_then(Value::as_array)
        .ok_or_else(|| AcquisitionError::Parse("missing entries array".to_string()))?;

    let results = entries
        .iter()
        .filter_map(|entry| {
            let video_id = entry.get("id")?.as_str()?.to_string();
            let title = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let channel = entry
                .get("channel")
                .or_else(|| entry.get("uploader"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let duration = entry
                .get("duration")
                .and_then(Value::as_f64)
                .map(|d| d.round() as u64);
            let thumbnail = entry
                .get("thumbnails")
                .and_then(Value::as_array)
                .and_then(|thumbs| thumbs.last())
                .and_then(|t| t.get("url"))
                .or_else(|| entry.get("thumbnail"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let url = entry
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", video_id));

            Some(VideoSummary {
                video_id,
                title,
                channel,
                duration,
                thumbnail,
                url,
            })
        })
        .collect();

    Ok(results)
}

/// Parses a `[download]  42.3% of ...` line.
fn parse_download_progress(line: &str) -> Option<f32> {
    DOWNLOAD_PROGRESS_RE
        .captures(line)?
        .get(1)?
        .as_str()
        .parse::<f32>()
        .ok()
        .filter(|p| (0.0..=100.0).contains(p))
}

#[async_trait]
impl Acquirer for YtDlpAcquirer {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<VideoSummary>, AcquisitionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AcquisitionError::invalid("query must not be empty"));
        }
        let limit = limit.max(1);

        debug!(query, limit, "Searching with yt-dlp");

        let mut cmd = Command::new(&self.config.ytdlp_path);
        cmd.args(Self::build_search_args(query, limit))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(self.config.timeout_secs), cmd.output())
            .await
            .map_err(|_| AcquisitionError::Timeout {
                timeout_secs: self.config.timeout_secs,
            })?
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            return Err(AcquisitionError::ProcessFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut results = parse_search_results(&String::from_utf8_lossy(&output.stdout))?;
        results.truncate(limit);
        info!(query, count = results.len(), "Search finished");
        Ok(results)
    }

    async fn download(
        &self,
        request: DownloadRequest,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<PathBuf, AcquisitionError> {
        if request.video_id.trim().is_empty() {
            return Err(AcquisitionError::invalid("video_id must not be empty"));
        }

        let (artist, stem) = request.output_names()?;
        let dir = match artist {
            Some(artist) => self.music_dir.join(artist),
            None => self.music_dir.clone(),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let template = dir.join(format!("{}.%(ext)s", stem));
        let expected = dir.join(format!("{}.{}", stem, AUDIO_EXTENSION));
        let args = self.build_download_args(&template, &request.url());

        info!(video_id = %request.video_id, output = %expected.display(), "Starting download");

        let mut child = Command::new(&self.config.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let stdout_reader = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(percent) = parse_download_progress(&line) {
                        if let Some(ref tx) = progress_tx {
                            let _ = tx.try_send(DownloadProgress { percent });
                        }
                    }
                }
            })
        });

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = sleep(Duration::from_secs(self.config.timeout_secs)) => {
                let _ = child.kill().await;
                return Err(AcquisitionError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if let Some(handle) = stdout_reader {
            let _ = handle.await;
        }
        let stderr = match stderr_reader {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(AcquisitionError::ProcessFailed {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        if !expected.is_file() {
            warn!(path = %expected.display(), "yt-dlp exited cleanly without output");
            return Err(AcquisitionError::OutputMissing { path: expected });
        }

        info!(video_id = %request.video_id, path = %expected.display(), "Download finished");
        Ok(expected)
    }

    async fn validate(&self) -> Result<(), AcquisitionError> {
        let output = Command::new(&self.config.ytdlp_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            return Err(AcquisitionError::ProcessFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "yt-dlp available"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_results() {
        let json = r#"{
            "_type": "playlist",
            "entries": [
                {
                    "id": "abc123",
                    "title": "High and Dry",
                    "channel": "Radiohead",
                    "duration": 257.0,
                    "thumbnails": [{"url": "https://i.ytimg.com/small.jpg"}, {"url": "https://i.ytimg.com/big.jpg"}],
                    "url": "https://www.youtube.com/watch?v=abc123"
                },
                {
                    "id": "def456",
                    "title": "Fake Plastic Trees",
                    "uploader": "RadioheadVEVO"
                },
                {"title": "no id, skipped"}
            ]
        }"#;

        let results = parse_search_results(json).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].video_id, "abc123");
        assert_eq!(results[0].duration, Some(257));
        assert_eq!(
            results[0].thumbnail.as_deref(),
            Some("https://i.ytimg.com/big.jpg")
        );
        assert_eq!(results[1].channel, "RadioheadVEVO");
        assert_eq!(results[1].duration, None);
        assert_eq!(results[1].url, "https://www.youtube.com/watch?v=def456");
    }

    #[test]
    fn test_parse_search_results_invalid() {
        assert!(matches!(
            parse_search_results("not json"),
            Err(AcquisitionError::Parse(_))
        ));
        assert!(matches!(
            parse_search_results("{}"),
            Err(AcquisitionError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_download_progress() {
        assert_eq!(
            parse_download_progress("[download]  42.3% of 3.50MiB at 1.2MiB/s ETA 00:02"),
            Some(42.3)
        );
        assert_eq!(parse_download_progress("[download] 100% of 3.50MiB"), Some(100.0));
        assert_eq!(parse_download_progress("[ExtractAudio] Destination: a.mp3"), None);
    }

    #[test]
    fn test_target_dir() {
        let acquirer = YtDlpAcquirer::new(AcquisitionConfig::default(), "/music");

        let plain = DownloadRequest::new("vid", "Song A");
        assert_eq!(acquirer.target_dir(&plain).unwrap(), PathBuf::from("/music"));

        let with_artist = DownloadRequest::new("vid", "Song: B?").with_artist("AC/DC");
        assert_eq!(
            acquirer.target_dir(&with_artist).unwrap(),
            PathBuf::from("/music/ACDC")
        );

        let blank_artist = DownloadRequest::new("vid", "???").with_artist("  ");
        assert_eq!(acquirer.target_dir(&blank_artist).unwrap(), PathBuf::from("/music"));
    }

    #[test]
    fn test_target_dir_rejects_dot_artists() {
        let acquirer = YtDlpAcquirer::new(AcquisitionConfig::default(), "/srv/music");
        for artist in ["..", ".", "../"] {
            let request = DownloadRequest::new("vid", "Song A").with_artist(artist);
            assert!(
                matches!(
                    acquirer.target_dir(&request),
                    Err(AcquisitionError::InvalidRequest(_))
                ),
                "artist {:?} accepted",
                artist
            );
        }
    }

    #[tokio::test]
    async fn test_download_rejects_parent_artist_before_spawning() {
        let temp = tempfile::TempDir::new().unwrap();
        let music = temp.path().join("music");
        let config =
            AcquisitionConfig::default().with_ytdlp_path(PathBuf::from("/nonexistent/yt-dlp"));
        let acquirer = YtDlpAcquirer::new(config, &music);

        let result = acquirer
            .download(DownloadRequest::new("vid", "Song A").with_artist(".."), None)
            .await;
        assert!(matches!(result, Err(AcquisitionError::InvalidRequest(_))));
        assert!(!music.exists());
    }

    #[test]
    fn test_build_download_args() {
        let config = AcquisitionConfig {
            ffmpeg_location: Some(PathBuf::from("/opt/ffmpeg/bin")),
            ..Default::default()
        };
        let acquirer = YtDlpAcquirer::new(config, "/music");
        let args = acquirer.build_download_args(
            Path::new("/music/Song A.%(ext)s"),
            "https://www.youtube.com/watch?v=vid",
        );

        assert_eq!(&args[..2], ["-f", "bestaudio/best"]);
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "192"]));
        assert!(args.windows(2).any(|w| w == ["-o", "/music/Song A.%(ext)s"]));
        assert!(args.windows(2).any(|w| w == ["--ffmpeg-location", "/opt/ffmpeg/bin"]));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=vid");
    }

    #[test]
    fn test_build_search_args() {
        let args = YtDlpAcquirer::build_search_args("radiohead high and dry", 5);
        assert_eq!(args.last().unwrap(), "ytsearch5:radiohead high and dry");
        assert!(args.contains(&"--flat-playlist".to_string()));
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let acquirer = YtDlpAcquirer::new(AcquisitionConfig::default(), "/music");
        let result = acquirer.search("   ", 5).await;
        assert!(matches!(result, Err(AcquisitionError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_download_missing_binary() {
        let temp = tempfile::TempDir::new().unwrap();
        let config =
            AcquisitionConfig::default().with_ytdlp_path(PathBuf::from("/nonexistent/yt-dlp"));
        let acquirer = YtDlpAcquirer::new(config, temp.path());

        let result = acquirer
            .download(DownloadRequest::new("vid", "Song A"), None)
            .await;
        assert!(matches!(result, Err(AcquisitionError::BinaryNotFound { .. })));
    }
}
