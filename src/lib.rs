//! # sovits-rs
//!
//! A Rust library orchestrating text-to-speech synthesis with the
//! GPT-SoVITS engine.
//!
//! The native engine itself is an external collaborator reached through a
//! narrow four-call contract; this crate owns everything around it:
//!
//! - **Engine lifecycle**: load → prime → ready → infer over exactly one
//!   owned native instance, with release-on-drop teardown
//! - **Asset staging**: the eight-file model bundle is copied into a
//!   process-local cache before the engine ever sees a path
//! - **Canonical WAV output**: byte-exact RIFF/WAVE (mono, 16-bit, 32 kHz)
//!   from the engine's raw float samples
//! - **Replay history** and **single-session playback**
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! sovits-rs = { version = "0.3", features = ["native"] }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use sovits_rs::engine::NativeEngine;
//! use sovits_rs::{InferenceOrchestrator, PipelineConfig, PipelineEvent};
//!
//! let config = PipelineConfig::new("/data/tts-cache");
//! let (mut orchestrator, mut events) = InferenceOrchestrator::new(Arc::new(NativeEngine), config);
//!
//! orchestrator.load_model("/sdcard/gpt-sovits-models".into());
//! while let Some(event) = events.recv().await {
//!     match event {
//!         PipelineEvent::ModelReady => orchestrator.synthesize("Hello, world!"),
//!         PipelineEvent::Synthesized(entry) => println!("{}", entry.audio_path.display()),
//!         _ => {}
//!     }
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod playback;
pub mod wav;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::PipelineConfig;
pub use engine::{AssetBundle, AssetRole, EngineHandle, EngineState, InferenceBackend};
pub use error::PipelineError;
pub use history::{AudioEntry, AudioHistoryStore};
pub use orchestrator::{InferenceOrchestrator, PipelineEvent};
pub use playback::PlaybackController;
pub use wav::{WavSpec, SAMPLE_RATE};

/// The result of one synthesis (text-to-speech) call.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw audio samples as normalized f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (32000 for GPT-SoVITS)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &std::path::Path) -> Result<(), PipelineError> {
        let spec = WavSpec {
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            channels: 1,
        };
        wav::write_wav_file(path, &spec, &self.samples)
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
