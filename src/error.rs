use std::path::PathBuf;

use crate::engine::assets::AssetRole;
use crate::engine::handle::EngineState;

/// Errors surfaced by the synthesis pipeline.
///
/// Every variant is recoverable at the orchestration layer: a failed stage
/// rolls back whatever it partially acquired (the native handle in
/// particular) and reports here instead of propagating a panic.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("model source {0:?} is not an accessible directory")]
    InvalidSource(PathBuf),
    #[error("required model file '{}' ({role}) missing from the source folder", .role.file_name())]
    MissingAsset { role: AssetRole },
    #[error("failed to stage '{}' ({role}) into the cache: {source}", .role.file_name())]
    CopyFailed {
        role: AssetRole,
        #[source]
        source: std::io::Error,
    },
    #[error("engine initialization returned a null handle")]
    InitFailed,
    #[error("reference audio processing failed; engine released")]
    PrimeFailed,
    #[error("engine is not ready for inference (state: {state})")]
    NotReady { state: EngineState },
    #[error("inference produced no audio")]
    InferFailed,
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Config(String),
}
