pub mod acquisition;
pub mod config;
pub mod library;
pub mod metrics;
pub mod processor;
pub mod reorganizer;
pub mod separator;
pub mod tasks;
pub mod testing;
pub mod transcoder;

pub use acquisition::{
    sanitize_filename, AcquisitionConfig, AcquisitionError, Acquirer, DownloadRequest,
    VideoSummary, YtDlpAcquirer,
};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config,
    ConfigError, LibraryConfig, ServerConfig, TasksConfig,
};
pub use library::{
    LibraryError, LibraryIndex, LibraryStats, StemSet, Track, AUDIO_EXTENSION,
};
pub use processor::{
    PoolStatus, Processor, ProcessorConfig, ProcessorError, SeparationDefaults, SeparationJob,
};
pub use reorganizer::{MigrationReport, RelocationJob, RelocationResult, ReorganizeError, Reorganizer};
pub use separator::{DemucsSeparator, SeparationError, Separator, SeparatorConfig};
pub use tasks::{InMemoryTaskStore, Task, TaskError, TaskKind, TaskPatch, TaskStatus, TaskStore};
pub use transcoder::{FfmpegTranscoder, Transcoder, TranscoderConfig, TranscoderError};
