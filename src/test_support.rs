//! Shared scripted collaborators for the test suite.
//!
//! The native engine only exists behind the `native` feature, so every test
//! drives the pipeline through [`ScriptedBackend`], which records calls and
//! plays back configured outcomes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::engine::assets::AssetBundle;
use crate::engine::backend::InferenceBackend;

/// A programmable stand-in for the native engine.
pub(crate) struct ScriptedBackend {
    next_token: AtomicI64,
    init_succeeds: bool,
    prime_succeeds: bool,
    /// Samples returned by `infer`; `None` scripts a failure.
    infer_output: Option<Vec<f32>>,
    /// Tokens passed to `release`, in call order.
    pub released: Mutex<Vec<i64>>,
    /// `(ref_audio, ref_text)` pairs passed to `prime_reference`.
    pub primed: Mutex<Vec<(PathBuf, String)>>,
    /// Texts passed to `infer`, in call order.
    pub infer_texts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(init_succeeds: bool, prime_succeeds: bool, infer_output: Option<Vec<f32>>) -> Self {
        Self {
            next_token: AtomicI64::new(1),
            init_succeeds,
            prime_succeeds,
            infer_output,
            released: Mutex::new(Vec::new()),
            primed: Mutex::new(Vec::new()),
            infer_texts: Mutex::new(Vec::new()),
        }
    }

    /// Every stage succeeds; `infer` returns a short ramp.
    pub fn working() -> Self {
        Self::new(true, true, Some(vec![0.0, 0.25, -0.25, 0.5]))
    }

    pub fn failing_init() -> Self {
        Self::new(false, true, None)
    }

    pub fn failing_prime() -> Self {
        Self::new(true, false, None)
    }

    pub fn failing_infer() -> Self {
        Self::new(true, true, None)
    }
}

impl InferenceBackend for ScriptedBackend {
    fn init(&self, _bundle: &AssetBundle, _context_window: i32) -> i64 {
        if self.init_succeeds {
            self.next_token.fetch_add(1, Ordering::SeqCst)
        } else {
            0
        }
    }

    fn prime_reference(&self, _token: i64, ref_audio: &Path, ref_text: &str) -> bool {
        self.primed
            .lock()
            .unwrap()
            .push((ref_audio.to_path_buf(), ref_text.to_string()));
        self.prime_succeeds
    }

    fn infer(&self, _token: i64, text: &str) -> Option<Vec<f32>> {
        self.infer_texts.lock().unwrap().push(text.to_string());
        self.infer_output.clone()
    }

    fn release(&self, token: i64) {
        self.released.lock().unwrap().push(token);
    }
}

/// A bundle for driving [`crate::EngineHandle`] directly in tests.
pub(crate) fn staged_bundle() -> AssetBundle {
    AssetBundle::fixture(Path::new("/tmp/sovits-test-bundle"))
}
