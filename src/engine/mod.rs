//! GPT-SoVITS engine integration.
//!
//! Three pieces: asset staging ([`assets`]), the narrow capability contract
//! the native library is reached through ([`backend`]), and the lifecycle
//! state machine owning the single live engine instance ([`handle`]).
//!
//! The real FFI binding is only compiled with the `native` feature; every
//! other consumer (including the test suite) works against the
//! [`InferenceBackend`] trait.

pub mod assets;
pub mod backend;
#[cfg(feature = "native")]
pub mod ffi;
pub mod handle;

pub use assets::{AssetBundle, AssetRole};
pub use backend::InferenceBackend;
#[cfg(feature = "native")]
pub use ffi::NativeEngine;
pub use handle::{EngineHandle, EngineState, ModelToken};
