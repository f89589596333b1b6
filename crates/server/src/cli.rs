//! Command-line interface.
//!
//! `serve` (the default) runs the HTTP API; every other subcommand runs one
//! operation against the same state and prints the result.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use stemyard_core::{DownloadRequest, LibraryIndex, SeparationJob, Task, TaskStatus};

use crate::state::AppState;

/// Default configuration file, used when neither `--config` nor
/// `STEMYARD_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "stemyard", version)]
#[command(about = "Download tracks, split them into stems and keep the library tidy")]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "STEMYARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve,
    /// Search the video platform
    Search {
        query: String,
        #[arg(long, short, default_value_t = 5)]
        limit: usize,
    },
    /// Search, download the first hit and optionally separate it
    Fetch {
        query: String,
        #[arg(long, short)]
        artist: Option<String>,
        #[arg(long)]
        separate: bool,
        #[arg(long, short)]
        model: Option<String>,
        #[arg(long, short)]
        device: Option<String>,
    },
    /// Separate one track, or every track under a directory with --all.
    /// Without --artist, stems land next to each track.
    Separate {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        file: Option<PathBuf>,
        #[arg(long)]
        all: bool,
        /// Directory scanned by --all (defaults to the music directory)
        #[arg(long, requires = "all")]
        dir: Option<PathBuf>,
        #[arg(long, short)]
        artist: Option<String>,
        #[arg(long, short)]
        model: Option<String>,
        #[arg(long, short)]
        device: Option<String>,
    },
    /// List tracks
    Songs {
        #[arg(long, short)]
        artist: Option<String>,
    },
    /// List artists
    Artists,
    /// Show library statistics
    Stats,
    /// Show the stems of a track
    Stems { id: String },
    /// Move a track (and its colocated stems) under an artist directory
    Organize {
        file: PathBuf,
        #[arg(long, short)]
        artist: String,
    },
    /// Move stems from the old per-model layout next to their tracks
    Migrate,
}

impl Cli {
    /// The effective command; `serve` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Config path and whether it was chosen explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }
}

fn separation_job(
    track: PathBuf,
    artist: Option<String>,
    model: Option<String>,
    device: Option<String>,
) -> SeparationJob {
    let mut job = SeparationJob::new(track).with_artist(artist);
    if let Some(model) = model {
        job = job.with_model(model);
    }
    if let Some(device) = device {
        job = job.with_device(device);
    }
    job
}

fn print_separation(task: &Task) {
    match task.status {
        TaskStatus::Completed => {
            let dir = task
                .result_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("Stems written to {}", dir);
        }
        _ => println!("Separation failed: {}", task.message),
    }
}

/// Run a non-serve command.
pub async fn run_command(command: Command, state: &AppState) -> Result<()> {
    match command {
        Command::Serve => bail!("serve is handled by the binary"),
        Command::Search { query, limit } => {
            let results = state
                .acquirer()
                .search(&query, limit.max(1))
                .await
                .context("Search failed")?;
            if results.is_empty() {
                println!("No results for '{}'", query);
            }
            for (i, video) in results.iter().enumerate() {
                let duration = video
                    .duration
                    .map(|d| format!("{}:{:02}", d / 60, d % 60))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "{:>2}. {} [{}] ({}) {}",
                    i + 1,
                    video.title,
                    video.channel,
                    duration,
                    video.url
                );
            }
        }
        Command::Fetch {
            query,
            artist,
            separate,
            model,
            device,
        } => {
            let results = state
                .acquirer()
                .search(&query, 1)
                .await
                .context("Search failed")?;
            let Some(video) = results.into_iter().next() else {
                bail!("No results for '{}'", query);
            };
            println!("Downloading {} ({})", video.title, video.video_id);

            let mut request = DownloadRequest::new(video.video_id, video.title);
            if let Some(artist) = artist.clone() {
                request = request.with_artist(artist);
            }
            let (_, path) = state
                .processor()
                .download(request)
                .await
                .context("Download failed")?;
            println!("Saved {}", path.display());

            if separate {
                let job = separation_job(path, artist, model, device);
                let task = state.processor().separate(job).await?;
                print_separation(&task);
                if task.status != TaskStatus::Completed {
                    bail!("{}", task.message);
                }
            }
        }
        Command::Separate {
            file,
            all,
            dir,
            artist,
            model,
            device,
        } => {
            if all {
                let mut library_config = state.config().library.clone();
                if let Some(dir) = dir {
                    library_config.music_dir = dir;
                }
                let index = LibraryIndex::new(library_config);
                let tracks = tokio::task::spawn_blocking(move || index.list_tracks(None))
                    .await?
                    .context("Failed to list tracks")?;

                let mut failed = 0usize;
                for track in &tracks {
                    println!("Separating {}", track.file_path.display());
                    let job = separation_job(
                        track.file_path.clone(),
                        artist.clone(),
                        model.clone(),
                        device.clone(),
                    );
                    let task = state.processor().separate(job).await?;
                    print_separation(&task);
                    if task.status != TaskStatus::Completed {
                        failed += 1;
                    }
                }
                println!(
                    "Separated {} of {} tracks",
                    tracks.len() - failed,
                    tracks.len()
                );
                if failed > 0 {
                    bail!("{} separations failed", failed);
                }
            } else {
                let file = file.context("A track file or --all is required")?;
                let job = separation_job(file, artist, model, device);
                let task = state.processor().separate(job).await?;
                print_separation(&task);
                if task.status != TaskStatus::Completed {
                    bail!("{}", task.message);
                }
            }
        }
        Command::Songs { artist } => {
            let library = state.library().clone();
            let tracks =
                tokio::task::spawn_blocking(move || library.list_tracks(artist.as_deref()))
                    .await??;
            for track in tracks {
                println!("{} - {} ({})", track.artist, track.title, track.file_path.display());
            }
        }
        Command::Artists => {
            let library = state.library().clone();
            let artists = tokio::task::spawn_blocking(move || library.list_artists()).await??;
            for artist in artists {
                println!("{}", artist);
            }
        }
        Command::Stats => {
            let library = state.library().clone();
            let stats = tokio::task::spawn_blocking(move || library.library_stats()).await??;
            println!("Songs:     {}", stats.total_songs);
            println!("Artists:   {}", stats.total_artists);
            println!("Separated: {}", stats.total_separated);
            println!("Size:      {:.2} MB", stats.total_size_mb);
        }
        Command::Stems { id } => {
            let library = state.library().clone();
            let lookup = id.clone();
            let stems = tokio::task::spawn_blocking(move || library.get_stem_set(&lookup)).await?;
            match stems.output_dir {
                Some(dir) if !stems.stems.is_empty() => {
                    println!("{}", dir.display());
                    for (name, path) in &stems.stems {
                        println!("  {:<7} {}", name, path.display());
                    }
                }
                _ => println!("No stems found for '{}'", id),
            }
        }
        Command::Organize { file, artist } => {
            let target = state
                .processor()
                .reorganizer()
                .organize_track_by_artist(&file, &artist)
                .await
                .with_context(|| format!("Failed to organize {}", file.display()))?;
            println!("Moved to {}", target.display());
        }
        Command::Migrate => {
            let report = state
                .processor()
                .reorganizer()
                .migrate_legacy_layout()
                .await
                .context("Migration failed")?;
            for dir in &report.migrated {
                println!("Migrated {}", dir.display());
            }
            for song in &report.skipped {
                println!("Skipped {}", song);
            }
            for failure in &report.failed {
                println!("Failed {}: {}", failure.song, failure.error);
            }
            println!(
                "{} migrated, {} skipped, {} failed",
                report.migrated.len(),
                report.skipped.len(),
                report.failed.len()
            );
        }
    }
    Ok(())
}
