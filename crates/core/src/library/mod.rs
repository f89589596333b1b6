//! Read-only index over the music and separated trees.
//!
//! Every query is a fresh directory walk; nothing is cached or persisted.
//! Walks are synchronous, so async callers should go through
//! `tokio::task::spawn_blocking`.

mod error;
mod index;
mod types;

pub use error::LibraryError;
pub use index::LibraryIndex;
pub use types::{LibraryStats, StemSet, Track, AUDIO_EXTENSION, UNKNOWN_ARTIST};
