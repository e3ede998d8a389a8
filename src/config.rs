//! Pipeline configuration.
//!
//! Everything here has a sensible default except the cache directory, which
//! must point somewhere writable: staged model copies and generated WAV
//! files both land in it.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Transcript matching the reference clip (`ref.wav`) shipped with the
/// model bundle.
pub const DEFAULT_REFERENCE_TEXT: &str = "格式化，可以给自家的奶带来大量的";

/// Text synthesized when a request arrives with an empty string.
pub const DEFAULT_FALLBACK_TEXT: &str = "Hello, this is a test.";

/// Context-length parameter handed to the engine at initialization.
pub const DEFAULT_CONTEXT_WINDOW: i32 = 24;

/// Settings for one [`InferenceOrchestrator`](crate::InferenceOrchestrator).
///
/// ```
/// use sovits_rs::config::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::default()
///     .cache_dir("/tmp/sovits-cache")
///     .build()
///     .unwrap();
/// assert_eq!(config.context_window, 24);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct PipelineConfig {
    /// Process-owned directory for staged model files and generated audio.
    pub cache_dir: PathBuf,
    /// Transcript of the bundle's reference clip, used to prime the engine.
    #[serde(default = "reference_text_default")]
    #[builder(default = "DEFAULT_REFERENCE_TEXT.to_string()")]
    pub reference_text: String,
    /// Substituted when `synthesize` is called with empty text.
    #[serde(default = "fallback_text_default")]
    #[builder(default = "DEFAULT_FALLBACK_TEXT.to_string()")]
    pub fallback_text: String,
    /// Context length passed to the engine's init entry point.
    #[serde(default = "context_window_default")]
    #[builder(default = "DEFAULT_CONTEXT_WINDOW")]
    pub context_window: i32,
}

fn reference_text_default() -> String {
    DEFAULT_REFERENCE_TEXT.to_string()
}

fn fallback_text_default() -> String {
    DEFAULT_FALLBACK_TEXT.to_string()
}

fn context_window_default() -> i32 {
    DEFAULT_CONTEXT_WINDOW
}

impl PipelineConfig {
    /// Config with defaults for everything but the cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            reference_text: reference_text_default(),
            fallback_text: fallback_text_default(),
            context_window: context_window_default(),
        }
    }

    /// Load a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("failed to parse {}: {e}", path.display())))
    }
}
