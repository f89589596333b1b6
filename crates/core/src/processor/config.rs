//! Configuration for the processor module.

use serde::{Deserialize, Serialize};

/// Configuration for the job pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum jobs running at once; further jobs wait as `pending`.
    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,
}

fn default_max_parallel_jobs() -> usize {
    2
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: default_max_parallel_jobs(),
        }
    }
}

impl ProcessorConfig {
    pub fn with_max_parallel_jobs(mut self, max_parallel_jobs: usize) -> Self {
        self.max_parallel_jobs = max_parallel_jobs;
        self
    }
}
