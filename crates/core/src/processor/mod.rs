//! Job processor for downloads and separations.
//!
//! The `Processor` runs each operation as a tracked task on a pool bounded
//! by `max_parallel_jobs`. Jobs beyond the bound stay `pending` until a slot
//! frees up. Every task can be cancelled; a cancelled separation kills the
//! separator's child process.
//!
//! A separation moves through these steps:
//!
//! 1. `running` 10% "Separating audio" (separator progress mapped into 10..80)
//! 2. `running` 80% "Organizing files" (relocation by the reorganizer)
//! 3. `completed` 100% with the final stem directory as `result_path`
//!
//! # Example
//!
//! ```ignore
//! use stemyard_core::processor::{Processor, SeparationJob};
//!
//! let task_id = processor.submit_separation(
//!     SeparationJob::new("music/Radiohead/High and Dry.mp3")
//!         .with_artist(Some("Radiohead".to_string())),
//! )?;
//!
//! let task = processor.tasks().get(&task_id);
//! println!("{:?}", task.map(|t| t.status));
//! ```

mod config;
mod runner;
mod types;

pub use config::ProcessorConfig;
pub use runner::{Processor, ProcessorError, CANCELLED_MESSAGE};
pub use types::{PoolStatus, SeparationDefaults, SeparationJob};
