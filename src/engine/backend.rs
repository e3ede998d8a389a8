//! Capability contract for the native inference engine.
//!
//! The engine is an external collaborator: model deserialization, reference
//! conditioning, and synthesis all happen behind these four entry points.
//! Calls may block for seconds (model load in particular), so implementors
//! are invoked from blocking worker threads, never the interactive path.

use std::path::Path;

use super::assets::AssetBundle;

/// The four entry points of the native engine.
///
/// Token semantics: `init` returns an opaque engine token, with zero
/// signaling failure. All later calls take that token. `release` must be
/// idempotent; callers are allowed to hand it a token that was already
/// freed or never valid.
pub trait InferenceBackend: Send + Sync {
    /// Initialize an engine instance over the staged model files.
    fn init(&self, bundle: &AssetBundle, context_window: i32) -> i64;

    /// Condition the engine on a reference clip and its transcript.
    fn prime_reference(&self, token: i64, ref_audio: &Path, ref_text: &str) -> bool;

    /// Synthesize `text` into normalized f32 samples; `None` on failure.
    fn infer(&self, token: i64, text: &str) -> Option<Vec<f32>>;

    /// Free the engine instance behind `token`.
    fn release(&self, token: i64);
}
