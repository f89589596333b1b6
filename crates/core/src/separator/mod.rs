//! Separator module for splitting a mixed track into instrument stems.
//!
//! The `Separator` trait hides the external source-separation model. The
//! `DemucsSeparator` implementation shells out to the `demucs` CLI, reports
//! progress parsed from its progress bar, and can be cancelled, which kills
//! the child process.
//!
//! Output lands in a scratch location (`<work_dir>/<model>/<track>/`) that
//! is handed to the reorganizer; nothing here writes to the library.

mod config;
mod demucs;
mod error;
mod traits;
mod types;

pub use config::SeparatorConfig;
pub use demucs::DemucsSeparator;
pub use error::SeparationError;
pub use traits::Separator;
pub use types::{
    expected_stems, SeparationOutput, SeparationProgress, SeparationRequest, FOUR_STEMS,
    KNOWN_MODELS, SIX_STEMS, SIX_STEM_MODEL,
};
