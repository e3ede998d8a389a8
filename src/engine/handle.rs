//! Lifecycle of the single native engine instance.
//!
//! The protocol is strict: `load` acquires a token, `prime` conditions the
//! engine on the bundle's reference clip, and only then is `infer` legal.
//! A failure in `load` or `prime` tears the instance back down to
//! [`EngineState::Unloaded`] with the native resource released: a
//! loaded-but-unprimeable engine is never left dangling nor treated as
//! usable.

use std::fmt;
use std::sync::Arc;

use crate::engine::assets::AssetBundle;
use crate::engine::backend::InferenceBackend;
use crate::error::PipelineError;
use crate::wav::SAMPLE_RATE;
use crate::SynthesisResult;

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    /// Token acquired, reference not yet processed.
    Loaded,
    Priming,
    Ready,
    Inferring,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Unloaded => "unloaded",
            EngineState::Loading => "loading",
            EngineState::Loaded => "loaded",
            EngineState::Priming => "priming",
            EngineState::Ready => "ready",
            EngineState::Inferring => "inferring",
        };
        f.write_str(name)
    }
}

/// Owned handle to one live native engine instance.
///
/// The raw token never circulates on its own: it lives inside this type,
/// which releases it exactly once: explicitly via [`ModelToken::release`]
/// or implicitly on drop.
pub struct ModelToken {
    raw: i64,
    backend: Arc<dyn InferenceBackend>,
    released: bool,
}

impl ModelToken {
    fn new(raw: i64, backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            raw,
            backend,
            released: false,
        }
    }

    pub fn raw(&self) -> i64 {
        self.raw
    }

    /// Free the native resource. Safe to call more than once.
    pub fn release(&mut self) {
        if !self.released {
            self.backend.release(self.raw);
            self.released = true;
            log::debug!("released engine token {}", self.raw);
        }
    }
}

impl Drop for ModelToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ModelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelToken")
            .field("raw", &self.raw)
            .field("released", &self.released)
            .finish()
    }
}

/// State machine over the single engine instance.
///
/// At most one token is live at a time: a `load` while a previous instance
/// exists releases the old resource before acquiring the new one.
pub struct EngineHandle {
    backend: Arc<dyn InferenceBackend>,
    token: Option<ModelToken>,
    bundle: Option<AssetBundle>,
    state: EngineState,
    context_window: i32,
}

impl EngineHandle {
    pub fn new(backend: Arc<dyn InferenceBackend>, context_window: i32) -> Self {
        Self {
            backend,
            token: None,
            bundle: None,
            state: EngineState::Unloaded,
            context_window,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// Initialize the engine over a staged bundle.
    ///
    /// Blocks for the duration of model deserialization; callers run this
    /// off the interactive path. Any previously live instance is released
    /// first.
    pub fn load(&mut self, bundle: AssetBundle) -> Result<(), PipelineError> {
        self.unload();
        self.state = EngineState::Loading;

        let raw = self.backend.init(&bundle, self.context_window);
        if raw == 0 {
            log::error!("engine init returned a null token");
            self.state = EngineState::Unloaded;
            return Err(PipelineError::InitFailed);
        }

        log::info!("engine initialized (token {raw})");
        self.token = Some(ModelToken::new(raw, Arc::clone(&self.backend)));
        self.bundle = Some(bundle);
        self.state = EngineState::Loaded;
        Ok(())
    }

    /// Condition the loaded engine on its reference clip.
    ///
    /// On failure the native resource is released and the handle returns to
    /// `Unloaded`.
    pub fn prime(&mut self, reference_text: &str) -> Result<(), PipelineError> {
        if self.state != EngineState::Loaded {
            return Err(PipelineError::NotReady { state: self.state });
        }
        self.state = EngineState::Priming;

        // Token and bundle exist in every state past Unloaded/Loading.
        let raw = self.token.as_ref().map(ModelToken::raw).unwrap_or(0);
        let reference_audio = self
            .bundle
            .as_ref()
            .map(|b| b.reference_audio().to_path_buf())
            .unwrap_or_default();

        if !self
            .backend
            .prime_reference(raw, &reference_audio, reference_text)
        {
            log::error!("reference audio processing failed; releasing engine");
            self.unload();
            return Err(PipelineError::PrimeFailed);
        }

        log::info!("engine primed on {}", reference_audio.display());
        self.state = EngineState::Ready;
        Ok(())
    }

    /// Synthesize `text`. Legal only from `Ready`.
    ///
    /// An attempt from any other state is a contract violation reported as
    /// [`PipelineError::NotReady`] without touching the native layer.
    pub fn infer(&mut self, text: &str) -> Result<SynthesisResult, PipelineError> {
        if self.state != EngineState::Ready {
            return Err(PipelineError::NotReady { state: self.state });
        }
        self.state = EngineState::Inferring;

        let raw = self.token.as_ref().map(ModelToken::raw).unwrap_or(0);
        let samples = self.backend.infer(raw, text);
        self.state = EngineState::Ready;

        match samples {
            Some(samples) if !samples.is_empty() => Ok(SynthesisResult {
                samples,
                sample_rate: SAMPLE_RATE,
            }),
            _ => {
                log::warn!("inference produced no audio for {text:?}");
                Err(PipelineError::InferFailed)
            }
        }
    }

    /// Release the native resource and return to `Unloaded`.
    ///
    /// Idempotent and safe from any state; runs unconditionally on drop so
    /// teardown can never skip it.
    pub fn unload(&mut self) {
        if let Some(mut token) = self.token.take() {
            token.release();
        }
        self.bundle = None;
        self.state = EngineState::Unloaded;
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineHandle, EngineState};
    use crate::error::PipelineError;
    use crate::test_support::{staged_bundle, ScriptedBackend};
    use std::sync::Arc;

    #[test]
    fn load_then_prime_reaches_ready() {
        let backend = Arc::new(ScriptedBackend::working());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        handle.load(staged_bundle()).unwrap();
        assert_eq!(handle.state(), EngineState::Loaded);

        handle.prime("reference transcript").unwrap();
        assert_eq!(handle.state(), EngineState::Ready);
        assert!(handle.is_ready());

        let primed = backend.primed.lock().unwrap();
        assert_eq!(primed.len(), 1);
        assert_eq!(primed[0].1, "reference transcript");
        assert!(primed[0].0.ends_with("ref.wav"));
    }

    #[test]
    fn null_token_reports_init_failed() {
        let backend = Arc::new(ScriptedBackend::failing_init());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        let err = handle.load(staged_bundle()).unwrap_err();
        assert!(matches!(err, PipelineError::InitFailed));
        assert_eq!(handle.state(), EngineState::Unloaded);
        // No token was acquired, so nothing must be released.
        assert!(backend.released.lock().unwrap().is_empty());
    }

    #[test]
    fn prime_failure_releases_exactly_once_and_unloads() {
        let backend = Arc::new(ScriptedBackend::failing_prime());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        handle.load(staged_bundle()).unwrap();
        let err = handle.prime("reference").unwrap_err();
        assert!(matches!(err, PipelineError::PrimeFailed));
        assert_eq!(handle.state(), EngineState::Unloaded);
        assert_eq!(backend.released.lock().unwrap().as_slice(), &[1]);

        // Further teardown must not double-free.
        handle.unload();
        drop(handle);
        assert_eq!(backend.released.lock().unwrap().as_slice(), &[1]);
    }

    #[test]
    fn infer_outside_ready_never_reaches_the_native_layer() {
        let backend = Arc::new(ScriptedBackend::working());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        let err = handle.infer("hello").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotReady {
                state: EngineState::Unloaded
            }
        ));

        handle.load(staged_bundle()).unwrap();
        let err = handle.infer("hello").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotReady {
                state: EngineState::Loaded
            }
        ));
        assert!(backend.infer_texts.lock().unwrap().is_empty());
    }

    #[test]
    fn infer_failure_returns_to_ready() {
        let backend = Arc::new(ScriptedBackend::failing_infer());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        handle.load(staged_bundle()).unwrap();
        handle.prime("reference").unwrap();

        let err = handle.infer("hello").unwrap_err();
        assert!(matches!(err, PipelineError::InferFailed));
        assert_eq!(handle.state(), EngineState::Ready);
    }

    #[test]
    fn successful_infer_reports_fixed_sample_rate() {
        let backend = Arc::new(ScriptedBackend::working());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        handle.load(staged_bundle()).unwrap();
        handle.prime("reference").unwrap();

        let result = handle.infer("hello").unwrap();
        assert_eq!(result.sample_rate, 32_000);
        assert!(!result.samples.is_empty());
        assert_eq!(handle.state(), EngineState::Ready);
        assert_eq!(backend.infer_texts.lock().unwrap().as_slice(), &["hello"]);
    }

    #[test]
    fn reload_releases_the_previous_token_first() {
        let backend = Arc::new(ScriptedBackend::working());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        handle.load(staged_bundle()).unwrap();
        handle.prime("reference").unwrap();
        handle.load(staged_bundle()).unwrap();

        // Token 1 must have been freed before token 2 was handed out.
        assert_eq!(backend.released.lock().unwrap().as_slice(), &[1]);
        assert_eq!(handle.state(), EngineState::Loaded);
    }

    #[test]
    fn drop_releases_the_live_token() {
        let backend = Arc::new(ScriptedBackend::working());
        {
            let mut handle = EngineHandle::new(backend.clone(), 24);
            handle.load(staged_bundle()).unwrap();
        }
        assert_eq!(backend.released.lock().unwrap().as_slice(), &[1]);
    }

    #[test]
    fn unload_is_idempotent_from_any_state() {
        let backend = Arc::new(ScriptedBackend::working());
        let mut handle = EngineHandle::new(backend.clone(), 24);

        handle.unload();
        assert_eq!(handle.state(), EngineState::Unloaded);

        handle.load(staged_bundle()).unwrap();
        handle.unload();
        handle.unload();
        assert_eq!(backend.released.lock().unwrap().as_slice(), &[1]);
    }
}
