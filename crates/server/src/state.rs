use std::sync::Arc;

use stemyard_core::{
    Acquirer, Config, DemucsSeparator, FfmpegTranscoder, InMemoryTaskStore, LibraryIndex,
    Processor, Reorganizer, SeparationDefaults, Separator, TaskStore, Transcoder, YtDlpAcquirer,
};

/// Shared application state
pub struct AppState {
    config: Config,
    tasks: Arc<dyn TaskStore>,
    acquirer: Arc<dyn Acquirer>,
    processor: Processor,
    library: LibraryIndex,
}

/// Adapters the state is built from. Tests swap in mocks here.
pub struct Adapters {
    pub acquirer: Arc<dyn Acquirer>,
    pub separator: Arc<dyn Separator>,
    pub transcoder: Arc<dyn Transcoder>,
}

impl Adapters {
    /// The real yt-dlp, demucs and ffmpeg adapters.
    pub fn from_config(config: &Config) -> Self {
        let transcoder: Arc<dyn Transcoder> =
            Arc::new(FfmpegTranscoder::new(config.transcoder.clone()));
        let separator: Arc<dyn Separator> = Arc::new(DemucsSeparator::new(
            config.separator.clone(),
            Arc::clone(&transcoder),
        ));
        let acquirer: Arc<dyn Acquirer> = Arc::new(YtDlpAcquirer::new(
            config.acquisition.clone(),
            config.library.music_dir.clone(),
        ));
        Self {
            acquirer,
            separator,
            transcoder,
        }
    }
}

impl AppState {
    pub fn new(config: Config, adapters: Adapters) -> Self {
        let tasks: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new(config.tasks.clone()));
        let reorganizer = Arc::new(Reorganizer::new(
            config.library.clone(),
            Arc::clone(&adapters.transcoder),
        ));
        let processor = Processor::new(
            config.processor.clone(),
            SeparationDefaults::from(&config.separator),
            Arc::clone(&tasks),
            Arc::clone(&adapters.acquirer),
            adapters.separator,
            reorganizer,
        );
        let library = LibraryIndex::new(config.library.clone());

        Self {
            config,
            tasks,
            acquirer: adapters.acquirer,
            processor,
            library,
        }
    }

    /// State wired to the real external tools.
    pub fn from_config(config: Config) -> Self {
        let adapters = Adapters::from_config(&config);
        Self::new(config, adapters)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tasks(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    pub fn acquirer(&self) -> &Arc<dyn Acquirer> {
        &self.acquirer
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn library(&self) -> &LibraryIndex {
        &self.library
    }
}
