//! Relocation of separation output into the library.
//!
//! The `Reorganizer` takes the stem directory a separator left in scratch
//! space and installs it at its final location:
//!
//! - `<separated_dir>/<artist>/<track>/` when an artist is given
//! - `<track dir>/<track>/` (colocated with the source) otherwise
//!
//! An existing destination is removed before the new stems move in, so a
//! repeat separation replaces rather than merges. Moves are a single rename
//! where possible and fall back to copy-then-remove across filesystems.
//! The per-job scratch tree is always cleaned up afterwards.

mod error;
mod fs_reorganizer;
mod types;

pub use error::ReorganizeError;
pub use fs_reorganizer::Reorganizer;
pub use types::{MigrationFailure, MigrationReport, RelocationJob, RelocationResult};
