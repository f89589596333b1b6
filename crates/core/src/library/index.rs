//! Directory-walking library index.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use super::error::LibraryError;
use super::types::{LibraryStats, StemSet, Track, AUDIO_EXTENSION, UNKNOWN_ARTIST};
use crate::config::LibraryConfig;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Lists tracks and stems by walking the library directories.
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    config: LibraryConfig,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(AUDIO_EXTENSION))
        .unwrap_or(false)
}

impl LibraryIndex {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// `<dir>/<song>/` is a colocated stem directory when `<dir>/<song>.<ext>` exists.
    fn is_colocated_stem_dir(&self, dir: &Path) -> bool {
        let Some(name) = dir.file_name() else {
            return false;
        };
        let mut file_name = name.to_os_string();
        file_name.push(".");
        file_name.push(AUDIO_EXTENSION);
        dir.with_file_name(file_name).is_file()
    }

    /// Stem files directly inside `dir`, keyed by stem name.
    fn stems_in(&self, dir: &Path) -> BTreeMap<String, PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return BTreeMap::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_audio_file(p))
            .filter_map(|p| {
                let name = p.file_stem()?.to_string_lossy().to_string();
                Some((name, p))
            })
            .collect()
    }

    /// Audio files under the music root, skipping hidden entries and
    /// colocated stem directories.
    fn music_files(&self) -> Result<Vec<DirEntry>, LibraryError> {
        let root = &self.config.music_dir;
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(is_hidden(e)
                        || (e.file_type().is_dir() && self.is_colocated_stem_dir(e.path())))
            });

        for entry in walker {
            match entry {
                Ok(e) if e.file_type().is_file() && is_audio_file(e.path()) => {
                    files.push(e)
                }
                Ok(_) => {}
                Err(e) if e.depth() == 0 => return Err(std::io::Error::from(e).into()),
                Err(e) => warn!(error = %e, "Skipping unreadable library entry"),
            }
        }
        Ok(files)
    }

    fn artist_for(&self, file: &Path) -> String {
        let relative = file
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.config.music_dir).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        if relative.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            relative
        }
    }

    /// Tracks in the music tree, optionally restricted to one artist, sorted
    /// by (artist, title).
    pub fn list_tracks(&self, artist: Option<&str>) -> Result<Vec<Track>, LibraryError> {
        let artist = artist.map(str::trim).filter(|a| !a.is_empty());

        let mut tracks: Vec<Track> = self
            .music_files()?
            .into_iter()
            .filter_map(|entry| {
                let path = entry.into_path();
                let id = path.file_stem()?.to_string_lossy().to_string();
                let track_artist = self.artist_for(&path);
                if artist.is_some_and(|a| a != track_artist) {
                    return None;
                }
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                Some(Track {
                    title: id.clone(),
                    id,
                    artist: track_artist,
                    file_path: path,
                    size,
                })
            })
            .collect();

        tracks.sort_by(|a, b| {
            (&a.artist, &a.title, &a.file_path).cmp(&(&b.artist, &b.title, &b.file_path))
        });
        Ok(tracks)
    }

    /// Artist directories directly under the music root, sorted.
    pub fn list_artists(&self) -> Result<Vec<String>, LibraryError> {
        let root = &self.config.music_dir;
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut artists: Vec<String> = std::fs::read_dir(root)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir() && !self.is_colocated_stem_dir(p))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .filter(|name| !name.starts_with('.'))
            .collect();
        artists.sort();
        Ok(artists)
    }

    /// Separated directories under the separated root, in sorted walk order.
    fn separated_dirs(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(&self.config.separated_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(DirEntry::into_path)
    }

    /// Stems for a track. Returns an empty set when nothing matches.
    ///
    /// Lookup order: a directory named `track_id` under the separated root,
    /// then the colocated directory next to a track named `track_id`, then
    /// (when enabled) any separated directory whose path contains `track_id`.
    pub fn get_stem_set(&self, track_id: &str) -> StemSet {
        let track_id = track_id.trim();
        if track_id.is_empty() {
            return StemSet::empty(track_id);
        }

        let found = self
            .separated_dirs()
            .filter(|dir| dir.file_name().is_some_and(|n| n.to_string_lossy() == track_id))
            .map(|dir| (self.stems_in(&dir), dir))
            .find(|(stems, _)| !stems.is_empty())
            .or_else(|| self.find_colocated(track_id))
            .or_else(|| {
                if !self.config.substring_stem_lookup {
                    return None;
                }
                self.separated_dirs()
                    .filter(|dir| dir.to_string_lossy().contains(track_id))
                    .map(|dir| (self.stems_in(&dir), dir))
                    .find(|(stems, _)| !stems.is_empty())
            });

        match found {
            Some((stems, dir)) => StemSet {
                song_id: track_id.to_string(),
                output_dir: Some(dir),
                stems,
            },
            None => StemSet::empty(track_id),
        }
    }

    fn find_colocated(&self, track_id: &str) -> Option<(BTreeMap<String, PathBuf>, PathBuf)> {
        let files = self.music_files().ok()?;
        files
            .iter()
            .filter(|e| e.path().file_stem().is_some_and(|s| s.to_string_lossy() == track_id))
            .filter_map(|e| e.path().parent().map(|p| p.join(track_id)))
            .map(|dir| (self.stems_in(&dir), dir))
            .find(|(stems, _)| !stems.is_empty())
    }

    /// Aggregate counts over both trees.
    pub fn library_stats(&self) -> Result<LibraryStats, LibraryError> {
        let tracks = self.list_tracks(None)?;

        // Distinct track directories below the root, so a real `Unknown/`
        // directory counts while loose tracks do not.
        let artists: BTreeSet<&Path> = tracks
            .iter()
            .filter_map(|t| t.file_path.parent())
            .filter(|dir| *dir != self.config.music_dir.as_path())
            .collect();

        let mut separated: BTreeSet<PathBuf> = self
            .separated_dirs()
            .filter(|dir| !self.stems_in(dir).is_empty())
            .collect();
        separated.extend(
            tracks
                .iter()
                .filter_map(|t| t.file_path.parent().map(|p| p.join(&t.id)))
                .filter(|dir| !self.stems_in(dir).is_empty()),
        );

        let total_bytes: u64 = tracks.iter().map(|t| t.size).sum();
        let total_size_mb = (total_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0;

        Ok(LibraryStats {
            total_songs: tracks.len(),
            total_artists: artists.len(),
            total_separated: separated.len(),
            total_size_mb,
        })
    }
}
