//! Transcoder module for turning separated waveforms into compressed audio.
//!
//! This module provides the `Transcoder` trait and an FFmpeg-backed
//! implementation that encodes a single input file to MP3 at a fixed
//! bitrate.
//!
//! # Example
//!
//! ```ignore
//! use stemyard_core::transcoder::{FfmpegTranscoder, Transcoder, TranscodeJob};
//!
//! let transcoder = FfmpegTranscoder::with_defaults();
//! transcoder.validate().await?;
//!
//! let result = transcoder
//!     .transcode(TranscodeJob::new("stems/vocals.wav", "stems/vocals.mp3", 320))
//!     .await?;
//! println!("Wrote {} bytes in {} ms", result.output_size_bytes, result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{TranscodeJob, TranscodeResult};
