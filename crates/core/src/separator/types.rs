//! Types for the separator module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The default model, which produces six stems.
pub const SIX_STEM_MODEL: &str = "htdemucs_6s";

/// Stems produced by the six-stem model.
pub const SIX_STEMS: [&str; 6] = ["vocals", "drums", "bass", "other", "guitar", "piano"];

/// Stems produced by the four-stem models (htdemucs, htdemucs_ft, mdx_extra).
pub const FOUR_STEMS: [&str; 4] = ["vocals", "drums", "bass", "other"];

/// Models whose output layout is `<work_dir>/<model>/<track>/`.
pub const KNOWN_MODELS: [&str; 4] = [SIX_STEM_MODEL, "htdemucs", "htdemucs_ft", "mdx_extra"];

/// Stems a model is expected to produce. Unknown models are assumed to be
/// four-stem variants.
pub fn expected_stems(model: &str) -> &'static [&'static str] {
    if model == SIX_STEM_MODEL {
        &SIX_STEMS
    } else {
        &FOUR_STEMS
    }
}

/// A separation request for one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationRequest {
    /// Track to separate.
    pub track_path: PathBuf,
    /// Model name, passed through to the separator.
    pub model: String,
    /// Execution device, passed through to the separator.
    pub device: String,
    /// Scratch directory owned by this request; removed by the reorganizer.
    pub work_dir: PathBuf,
}

impl SeparationRequest {
    /// Name of the track without extension; demucs names its output folder after it.
    pub fn track_name(&self) -> String {
        self.track_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Where demucs writes the stems for this request.
    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join(&self.model).join(self.track_name())
    }
}

/// Where a finished separation left its stems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationOutput {
    /// Directory holding the stem files.
    pub stem_dir: PathBuf,
    /// Per-request scratch tree containing `stem_dir`.
    pub scratch_root: PathBuf,
    /// Model that produced the stems.
    pub model: String,
}

/// Progress update during separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeparationProgress {
    /// Percent complete, 0-100.
    pub percent: u8,
}
