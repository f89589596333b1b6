use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::acquisition::AcquisitionConfig;
use crate::processor::ProcessorConfig;
use crate::separator::SeparatorConfig;
use crate::transcoder::TranscoderConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub separator: SeparatorConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with the web frontend, served at `/` when it exists.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

/// On-disk library layout
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Root of acquired tracks (`music/<artist?>/<title>.mp3`).
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,
    /// Root of artist-grouped stems (`separated/<artist>/<title>/<stem>.mp3`).
    #[serde(default = "default_separated_dir")]
    pub separated_dir: PathBuf,
    /// Fall back to matching any separated directory whose path contains the
    /// track id when no exact match exists.
    #[serde(default)]
    pub substring_stem_lookup: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            music_dir: default_music_dir(),
            separated_dir: default_separated_dir(),
            substring_stem_lookup: false,
        }
    }
}

fn default_music_dir() -> PathBuf {
    PathBuf::from("music")
}

fn default_separated_dir() -> PathBuf {
    PathBuf::from("separated")
}

/// Task retention policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// How long finished tasks stay queryable, in seconds.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Upper bound on retained tasks; oldest finished tasks go first.
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    /// Interval of the background sweeper, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            max_retained: default_max_retained(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_retained() -> usize {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    300
}
