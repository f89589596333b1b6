//! File system reorganizer implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::error::ReorganizeError;
use super::types::{MigrationFailure, MigrationReport, RelocationJob, RelocationResult};
use crate::acquisition::safe_dir_name;
use crate::config::LibraryConfig;
use crate::library::AUDIO_EXTENSION;
use crate::metrics;
use crate::separator::KNOWN_MODELS;
use crate::transcoder::{TranscodeJob, Transcoder};

/// Installs separated stems into the library layout.
pub struct Reorganizer {
    config: LibraryConfig,
    transcoder: Arc<dyn Transcoder>,
    /// One async lock per destination directory.
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Reorganizer {
    /// Creates a reorganizer for the given library layout. The transcoder is
    /// only used when migrating legacy waveform stems.
    pub fn new(config: LibraryConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            config,
            transcoder,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Final stem directory for a track.
    pub fn destination_for(
        &self,
        track_path: &Path,
        artist: Option<&str>,
    ) -> Result<PathBuf, ReorganizeError> {
        let track_name = track_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ReorganizeError::InvalidTrack {
                path: track_path.to_path_buf(),
            })?;

        match artist.map(str::trim).filter(|a| !a.is_empty()) {
            Some(artist) => {
                let dir = artist_dir_name(artist)?;
                Ok(self.config.separated_dir.join(dir).join(track_name))
            }
            None => {
                let parent = track_path.parent().unwrap_or_else(|| Path::new(""));
                Ok(parent.join(track_name))
            }
        }
    }

    /// Moves a stem directory to its final location and cleans up scratch.
    pub async fn relocate(&self, job: RelocationJob) -> Result<RelocationResult, ReorganizeError> {
        let result = self.relocate_stems(&job).await;

        if let Some(ref scratch) = job.scratch_root {
            let keep = result.as_ref().ok().map(|r| r.destination.as_path());
            self.cleanup_scratch(scratch, keep).await;
        }

        let label = match &result {
            Ok(_) => "success",
            Err(ReorganizeError::MissingOutput { .. }) => "missing_output",
            Err(_) => "failed",
        };
        metrics::RELOCATIONS_TOTAL.with_label_values(&[label]).inc();

        result
    }

    async fn relocate_stems(&self, job: &RelocationJob) -> Result<RelocationResult, ReorganizeError> {
        let destination = self.destination_for(&job.track_path, job.artist.as_deref())?;

        if self.count_stems(&job.stem_dir).await? == 0 {
            return Err(ReorganizeError::MissingOutput {
                path: job.stem_dir.clone(),
            });
        }

        let lock = self.lock_for(&destination);
        let _guard = lock.lock().await;

        self.prune_non_stems(&job.stem_dir).await?;

        let replaced = match fs::symlink_metadata(&destination).await {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %destination.display(), "Removing previous stem set");
                fs::remove_dir_all(&destination).await?;
                true
            }
            Ok(_) => {
                return Err(ReorganizeError::DestinationExists { path: destination });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        move_dir(&job.stem_dir, &destination).await?;

        let stems = self.list_stems(&destination).await?;
        info!(
            destination = %destination.display(),
            stems = stems.len(),
            replaced,
            "Stems relocated"
        );

        Ok(RelocationResult {
            destination,
            stems,
            replaced,
        })
    }

    /// Moves a track into `<music_dir>/<artist>/`, taking its colocated stem
    /// directory along. Returns the new track path.
    pub async fn organize_track_by_artist(
        &self,
        track_path: &Path,
        artist: &str,
    ) -> Result<PathBuf, ReorganizeError> {
        let file_name = track_path
            .file_name()
            .ok_or_else(|| ReorganizeError::InvalidTrack {
                path: track_path.to_path_buf(),
            })?;
        if !track_path.is_file() {
            return Err(ReorganizeError::InvalidTrack {
                path: track_path.to_path_buf(),
            });
        }

        let artist_dir = self.config.music_dir.join(artist_dir_name(artist.trim())?);
        let target = artist_dir.join(file_name);
        if track_path.parent() == Some(artist_dir.as_path()) {
            return Ok(target);
        }
        if fs::symlink_metadata(&target).await.is_ok() {
            return Err(ReorganizeError::DestinationExists { path: target });
        }

        fs::create_dir_all(&artist_dir).await?;
        move_file(track_path, &target).await?;

        let stem_dir = track_path.with_extension("");
        if stem_dir.is_dir() {
            let stem_target = target.with_extension("");
            let lock = self.lock_for(&stem_target);
            let _guard = lock.lock().await;
            if stem_target.exists() {
                fs::remove_dir_all(&stem_target).await?;
            }
            move_dir(&stem_dir, &stem_target).await?;
        }

        info!(from = %track_path.display(), to = %target.display(), "Track organized by artist");
        Ok(target)
    }

    /// Installs stems from the old `<separated_dir>/<model>/<song>/` layout
    /// next to their source tracks.
    pub async fn migrate_legacy_layout(&self) -> Result<MigrationReport, ReorganizeError> {
        let mut report = MigrationReport::default();

        for model in KNOWN_MODELS {
            let model_dir = self.config.separated_dir.join(model);
            if !model_dir.is_dir() {
                continue;
            }

            let mut songs = Vec::new();
            let mut entries = fs::read_dir(&model_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    songs.push(entry.path());
                }
            }
            songs.sort();

            for song_dir in songs {
                let song = song_dir
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();

                let Some(track) = self.find_track_by_name(&song).await? else {
                    warn!(model, song = %song, "No source track for legacy stems");
                    report.skipped.push(song);
                    continue;
                };

                match self.migrate_song(&song_dir, &track).await {
                    Ok(Some(destination)) => report.migrated.push(destination),
                    Ok(None) => report.skipped.push(song),
                    Err(e) => {
                        warn!(song = %song, error = %e, "Legacy migration failed");
                        report.failed.push(MigrationFailure {
                            song,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Legacy migration finished"
        );
        Ok(report)
    }

    /// Copies or encodes one legacy song folder. Returns `None` when the
    /// destination already holds stems.
    async fn migrate_song(
        &self,
        song_dir: &Path,
        track: &Path,
    ) -> Result<Option<PathBuf>, ReorganizeError> {
        let destination = self.destination_for(track, None)?;
        let lock = self.lock_for(&destination);
        let _guard = lock.lock().await;

        if self.count_stems(&destination).await? > 0 {
            return Ok(None);
        }
        fs::create_dir_all(&destination).await?;

        let mut entries = fs::read_dir(song_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
            else {
                continue;
            };
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let target = destination.join(stem).with_extension(AUDIO_EXTENSION);

            if ext == "wav" {
                self.transcoder
                    .transcode(TranscodeJob {
                        input_path: path.clone(),
                        output_path: target,
                        bitrate_kbps: None,
                    })
                    .await?;
            } else if ext == AUDIO_EXTENSION {
                fs::copy(&path, &target)
                    .await
                    .map_err(|e| ReorganizeError::copy_failed(path.clone(), target.clone(), e))?;
            }
        }

        Ok(Some(destination))
    }

    /// First track under the music root whose file stem equals `name`.
    async fn find_track_by_name(&self, name: &str) -> Result<Option<PathBuf>, ReorganizeError> {
        let root = self.config.music_dir.clone();
        let name = name.to_string();

        let found = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .find(|p| {
                    has_extension(p, AUDIO_EXTENSION)
                        && p.file_stem().is_some_and(|s| s.to_string_lossy() == name)
                })
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

        Ok(found)
    }

    async fn count_stems(&self, dir: &Path) -> Result<usize, ReorganizeError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file()
                && has_extension(&entry.path(), AUDIO_EXTENSION)
            {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn list_stems(&self, dir: &Path) -> Result<Vec<PathBuf>, ReorganizeError> {
        let mut stems = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if has_extension(&path, AUDIO_EXTENSION) {
                stems.push(path);
            }
        }
        stems.sort();
        Ok(stems)
    }

    /// Removes everything in `dir` that is not a stem file.
    async fn prune_non_stems(&self, dir: &Path) -> Result<(), ReorganizeError> {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                debug!(path = %path.display(), "Removing stray directory");
                fs::remove_dir_all(&path).await?;
            } else if !has_extension(&path, AUDIO_EXTENSION) {
                debug!(path = %path.display(), "Removing non-stem file");
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    /// Removes a job's scratch tree. Never touches library roots or `keep`.
    async fn cleanup_scratch(&self, scratch: &Path, keep: Option<&Path>) {
        let protected = [&self.config.music_dir, &self.config.separated_dir];
        if protected.iter().any(|root| root.starts_with(scratch)) {
            warn!(path = %scratch.display(), "Refusing to remove scratch root containing the library");
            return;
        }
        if keep.is_some_and(|k| k.starts_with(scratch)) {
            warn!(path = %scratch.display(), "Scratch root contains relocated stems, leaving it");
            return;
        }

        match fs::remove_dir_all(scratch).await {
            Ok(()) => debug!(path = %scratch.display(), "Scratch removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %scratch.display(), error = %e, "Failed to remove scratch"),
        }
    }

    fn lock_for(&self, destination: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(destination.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

fn artist_dir_name(artist: &str) -> Result<String, ReorganizeError> {
    safe_dir_name(artist).ok_or_else(|| ReorganizeError::InvalidArtist {
        artist: artist.to_string(),
    })
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

/// Cross-filesystem renames fail with EXDEV (18 on Linux).
fn is_cross_device(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

async fn move_file(source: &Path, destination: &Path) -> Result<(), ReorganizeError> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            fs::copy(source, destination).await.map_err(|e| {
                ReorganizeError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            fs::remove_file(source).await?;
            Ok(())
        }
        Err(e) => Err(ReorganizeError::move_failed(
            source.to_path_buf(),
            destination.to_path_buf(),
            e,
        )),
    }
}

/// Renames a directory, falling back to copy-then-remove across devices.
async fn move_dir(source: &Path, destination: &Path) -> Result<(), ReorganizeError> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Cross-device move, copying tree"
            );
            let (src, dst) = (source.to_path_buf(), destination.to_path_buf());
            tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
                .await
                .map_err(|e| std::io::Error::other(e.to_string()))?
                .map_err(|e| {
                    ReorganizeError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
                })?;
            fs::remove_dir_all(source).await?;
            Ok(())
        }
        Err(e) => Err(ReorganizeError::move_failed(
            source.to_path_buf(),
            destination.to_path_buf(),
            e,
        )),
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            copied += std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(copied)
}
