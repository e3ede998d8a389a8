//! FFI binding to the native GPT-SoVITS library.
//!
//! Compiled only with the `native` feature; the library is expected on the
//! linker path as `libgpt_sovits`. All marshalling stays inside this module
//! so the rest of the crate never sees a raw pointer.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;

use super::assets::AssetBundle;
use super::backend::InferenceBackend;

#[link(name = "gpt_sovits")]
extern "C" {
    fn gpt_sovits_init(
        g2pw_path: *const c_char,
        vits_path: *const c_char,
        ssl_path: *const c_char,
        t2s_encoder_path: *const c_char,
        t2s_fs_decoder_path: *const c_char,
        t2s_s_decoder_path: *const c_char,
        bert_path: *const c_char,
        max_length: c_int,
    ) -> i64;

    fn gpt_sovits_process_reference(
        handle: i64,
        ref_audio_path: *const c_char,
        ref_text: *const c_char,
    ) -> c_int;

    /// Returns a malloc'd sample buffer (null on failure); length is written
    /// through `out_len`. Ownership transfers to the caller, who must hand
    /// the buffer back to `gpt_sovits_free_buffer`.
    fn gpt_sovits_infer(handle: i64, text: *const c_char, out_len: *mut usize) -> *const f32;

    fn gpt_sovits_free_buffer(samples: *const f32, len: usize);

    fn gpt_sovits_release(handle: i64);
}

/// Backend over the dynamically linked engine.
pub struct NativeEngine;

fn c_path(path: &Path) -> Option<CString> {
    CString::new(path.to_string_lossy().into_owned().into_bytes()).ok()
}

impl InferenceBackend for NativeEngine {
    fn init(&self, bundle: &AssetBundle, context_window: i32) -> i64 {
        let mut paths = Vec::with_capacity(7);
        for path in bundle.model_paths() {
            match c_path(path) {
                Some(c) => paths.push(c),
                // An interior NUL can never reach the engine; surface it as
                // the contract's failure token.
                None => return 0,
            }
        }
        unsafe {
            gpt_sovits_init(
                paths[0].as_ptr(),
                paths[1].as_ptr(),
                paths[2].as_ptr(),
                paths[3].as_ptr(),
                paths[4].as_ptr(),
                paths[5].as_ptr(),
                paths[6].as_ptr(),
                context_window as c_int,
            )
        }
    }

    fn prime_reference(&self, token: i64, ref_audio: &Path, ref_text: &str) -> bool {
        let (Some(audio), Ok(text)) = (c_path(ref_audio), CString::new(ref_text)) else {
            return false;
        };
        unsafe { gpt_sovits_process_reference(token, audio.as_ptr(), text.as_ptr()) != 0 }
    }

    fn infer(&self, token: i64, text: &str) -> Option<Vec<f32>> {
        let text = CString::new(text).ok()?;
        let mut len = 0usize;
        let buffer = unsafe { gpt_sovits_infer(token, text.as_ptr(), &mut len) };
        if buffer.is_null() {
            return None;
        }
        let samples = unsafe { std::slice::from_raw_parts(buffer, len) }.to_vec();
        unsafe { gpt_sovits_free_buffer(buffer, len) };
        Some(samples)
    }

    fn release(&self, token: i64) {
        if token != 0 {
            unsafe { gpt_sovits_release(token) };
        }
    }
}
