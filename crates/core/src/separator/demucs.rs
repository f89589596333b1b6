//! Demucs-based separator implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::SeparatorConfig;
use super::error::SeparationError;
use super::traits::Separator;
use super::types::{
    expected_stems, SeparationOutput, SeparationProgress, SeparationRequest,
};
use crate::library::AUDIO_EXTENSION;
use crate::transcoder::{TranscodeJob, Transcoder};

/// Matches tqdm progress bars such as ` 42%|████      | 12.0/28.6`.
static PROGRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3})%\|").expect("progress regex is valid"));

/// Lines of stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Separator that runs the `demucs` CLI.
pub struct DemucsSeparator {
    config: SeparatorConfig,
    transcoder: Arc<dyn Transcoder>,
}

impl DemucsSeparator {
    /// Creates a separator. The transcoder encodes WAV stems when
    /// `config.mp3_output` is disabled.
    pub fn new(config: SeparatorConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self { config, transcoder }
    }

    pub fn config(&self) -> &SeparatorConfig {
        &self.config
    }

    /// Builds demucs arguments for a request.
    fn build_args(&self, request: &SeparationRequest) -> Vec<String> {
        let mut args = vec![
            "-n".to_string(),
            request.model.clone(),
            "-d".to_string(),
            request.device.clone(),
            "-o".to_string(),
            request.work_dir.to_string_lossy().to_string(),
        ];

        if self.config.mp3_output {
            args.extend([
                "--mp3".to_string(),
                "--mp3-bitrate".to_string(),
                self.config.mp3_bitrate_kbps.to_string(),
            ]);
        }

        args.extend(self.config.extra_args.iter().cloned());
        args.push(request.track_path.to_string_lossy().to_string());
        args
    }

    /// Encodes every `.wav` in `dir` to MP3 and removes the waveform.
    async fn encode_wav_stems(&self, dir: &Path) -> Result<usize, SeparationError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut encoded = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_wav = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
            if !is_wav {
                continue;
            }

            let output = path.with_extension(AUDIO_EXTENSION);
            self.transcoder
                .transcode(TranscodeJob::new(&path, &output, self.config.mp3_bitrate_kbps))
                .await?;
            tokio::fs::remove_file(&path).await?;
            encoded += 1;
        }

        Ok(encoded)
    }
}

/// Parses the last progress percentage found in a chunk of output.
fn parse_progress(chunk: &str) -> Option<u8> {
    PROGRESS_RE
        .captures_iter(chunk)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u8>().ok())
        .filter(|p| *p <= 100)
        .last()
}

/// Reads demucs stderr, forwarding progress and keeping a tail for errors.
///
/// tqdm redraws with carriage returns, so segments are split on `\r` as well
/// as newlines.
async fn pump_stderr<R>(
    stderr: R,
    progress_tx: Option<mpsc::Sender<SeparationProgress>>,
) -> String
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(stderr).split(b'\r');
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut last_percent = 0u8;

    while let Ok(Some(segment)) = segments.next_segment().await {
        let text = String::from_utf8_lossy(&segment);
        for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(percent) = parse_progress(line) {
                if percent > last_percent {
                    last_percent = percent;
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.try_send(SeparationProgress { percent });
                    }
                }
                continue;
            }
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}

#[async_trait]
impl Separator for DemucsSeparator {
    fn name(&self) -> &str {
        "demucs"
    }

    async fn separate(
        &self,
        request: SeparationRequest,
        progress_tx: Option<mpsc::Sender<SeparationProgress>>,
        cancel: CancellationToken,
    ) -> Result<SeparationOutput, SeparationError> {
        if !request.track_path.exists() {
            return Err(SeparationError::InputNotFound {
                path: request.track_path.clone(),
            });
        }

        tokio::fs::create_dir_all(&request.work_dir).await?;

        let start = Instant::now();
        let args = self.build_args(&request);
        info!(
            track = %request.track_path.display(),
            model = %request.model,
            device = %request.device,
            "Starting separation"
        );
        debug!(?args, "demucs arguments");

        let mut child = Command::new(&self.config.demucs_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SeparationError::BinaryNotFound {
                        path: self.config.demucs_path.clone(),
                    }
                } else {
                    SeparationError::Io(e)
                }
            })?;

        let stderr_reader = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(pump_stderr(stderr, progress_tx)));

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                warn!(track = %request.track_path.display(), "Separation cancelled, killing demucs");
                let _ = child.kill().await;
                return Err(SeparationError::Cancelled);
            }
            _ = sleep(Duration::from_secs(self.config.timeout_secs)) => {
                let _ = child.kill().await;
                return Err(SeparationError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        let stderr_tail = match stderr_reader {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(SeparationError::ProcessFailed {
                code: status.code(),
                stderr: stderr_tail,
            });
        }

        let stem_dir: PathBuf = request.output_dir();
        if !stem_dir.is_dir() {
            return Err(SeparationError::MissingOutput { path: stem_dir });
        }

        if !self.config.mp3_output {
            let encoded = self.encode_wav_stems(&stem_dir).await?;
            debug!(encoded, dir = %stem_dir.display(), "Encoded waveform stems");
        }

        for stem in expected_stems(&request.model) {
            if !stem_dir.join(format!("{}.{}", stem, AUDIO_EXTENSION)).exists() {
                warn!(stem, dir = %stem_dir.display(), "Expected stem missing from output");
            }
        }

        info!(
            dir = %stem_dir.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Separation finished"
        );

        Ok(SeparationOutput {
            stem_dir,
            scratch_root: request.work_dir,
            model: request.model,
        })
    }

    async fn validate(&self) -> Result<(), SeparationError> {
        Command::new(&self.config.demucs_path)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SeparationError::BinaryNotFound {
                        path: self.config.demucs_path.clone(),
                    }
                } else {
                    SeparationError::Io(e)
                }
            })?;
        Ok(())
    }
}
