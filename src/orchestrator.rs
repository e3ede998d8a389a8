//! Asynchronous pipeline orchestration.
//!
//! Two operations, `load_model` and `synthesize`, run against the single
//! shared [`EngineHandle`]. Blocking work (file staging, native calls, WAV
//! writes) happens on `spawn_blocking` workers; the host observes results
//! through a typed event channel instead of callbacks. A new `load_model`
//! supersedes any in-flight one; superseded or torn-down operations stop
//! publishing events, but resource release is unconditional: the engine
//! token frees on unload or drop no matter which stage was in flight.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::engine::assets;
use crate::engine::backend::InferenceBackend;
use crate::engine::handle::{EngineHandle, EngineState};
use crate::error::PipelineError;
use crate::history::AudioEntry;
use crate::wav::{self, WavSpec};

/// Load progress once the engine finished initialization.
const PROGRESS_INIT_DONE: f32 = 0.9;
/// Load progress once reference conditioning finished.
const PROGRESS_PRIME_DONE: f32 = 1.0;

/// Notifications published to the host.
///
/// Each operation produces exactly one terminal event: `ModelReady` or
/// `LoadFailed` for a load, `Synthesized` or `SynthesisFailed` for a
/// synthesis request.
#[derive(Debug)]
pub enum PipelineEvent {
    /// Cumulative model-loading progress in `[0, 1]`: staging owns `0..0.8`,
    /// init completion is 0.9, prime completion 1.0.
    LoadProgress(f32),
    /// The engine reached `Ready`.
    ModelReady,
    /// Loading failed; the engine is back to `Unloaded`.
    LoadFailed(PipelineError),
    /// A WAV file was written; latency covers inference through the write.
    Synthesized(AudioEntry),
    SynthesisFailed(PipelineError),
}

/// Event sender that goes quiet once its operation is superseded or torn
/// down. Cancellation suppresses publication only, never cleanup.
#[derive(Clone)]
struct EventGate {
    cancelled: Arc<AtomicBool>,
    events: UnboundedSender<PipelineEvent>,
}

impl EventGate {
    fn send(&self, event: PipelineEvent) {
        if !self.cancelled.load(Ordering::SeqCst) {
            let _ = self.events.send(event);
        }
    }
}

struct InFlight {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl InFlight {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Drives loading and synthesis against the engine and publishes results.
///
/// The orchestrator never touches history or playback; hosts subscribe to
/// the event receiver and wire those up themselves.
pub struct InferenceOrchestrator {
    engine: Arc<Mutex<EngineHandle>>,
    config: PipelineConfig,
    events: UnboundedSender<PipelineEvent>,
    load_op: Option<InFlight>,
    synth_op: Option<InFlight>,
}

impl InferenceOrchestrator {
    /// Build an orchestrator over `backend` and return it with the event
    /// receiver the host consumes.
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        config: PipelineConfig,
    ) -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = EngineHandle::new(backend, config.context_window);
        (
            Self {
                engine: Arc::new(Mutex::new(engine)),
                config,
                events,
                load_op: None,
                synth_op: None,
            },
            receiver,
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn engine_state(&self) -> EngineState {
        self.engine.lock().await.state()
    }

    /// Stage assets from `source`, then initialize and prime the engine.
    ///
    /// Supersedes any in-flight load: the superseded operation stops
    /// publishing, and because both serialize on the engine lock and the
    /// new attempt begins by unloading, the previous native resource is
    /// released before the new one is acquired.
    pub fn load_model(&mut self, source: PathBuf) {
        if let Some(prev) = self.load_op.take() {
            log::info!("superseding in-flight model load");
            prev.cancel();
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let gate = EventGate {
            cancelled: Arc::clone(&cancelled),
            events: self.events.clone(),
        };
        let engine = Arc::clone(&self.engine);
        let cache_dir = self.config.cache_dir.clone();
        let reference_text = self.config.reference_text.clone();

        let task = tokio::spawn(async move {
            let stage_gate = gate.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                run_load(&engine, &source, &cache_dir, &reference_text, &stage_gate)
            })
            .await;

            match outcome {
                Ok(Ok(())) => {
                    log::info!("model loaded successfully");
                    gate.send(PipelineEvent::ModelReady);
                }
                Ok(Err(err)) => {
                    log::error!("model load failed: {err}");
                    gate.send(PipelineEvent::LoadFailed(err));
                }
                Err(err) => {
                    log::error!("model load worker died: {err}");
                    gate.send(PipelineEvent::LoadFailed(PipelineError::Io(
                        std::io::Error::other("model load worker died"),
                    )));
                }
            }
        });

        self.load_op = Some(InFlight { cancelled, task });
    }

    /// Synthesize `text`, encode it to a uniquely named WAV file in the
    /// cache directory, and publish the resulting [`AudioEntry`].
    ///
    /// Empty input falls back to the configured default text. Requires the
    /// engine to be `Ready`; anything else surfaces as `SynthesisFailed`.
    pub fn synthesize(&mut self, text: impl Into<String>) {
        let mut text = text.into();
        if text.is_empty() {
            text = self.config.fallback_text.clone();
        }

        if let Some(prev) = self.synth_op.take() {
            // Finished tasks just get their handle dropped; an unfinished
            // one keeps running to completion but is no longer tracked.
            if !prev.task.is_finished() {
                log::debug!("previous synthesis still in flight; letting it finish");
            }
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let gate = EventGate {
            cancelled: Arc::clone(&cancelled),
            events: self.events.clone(),
        };
        let engine = Arc::clone(&self.engine);
        let cache_dir = self.config.cache_dir.clone();
        let started = Instant::now();

        let task = tokio::spawn(async move {
            let outcome =
                tokio::task::spawn_blocking(move || run_synthesis(&engine, text, &cache_dir, started))
                    .await;

            match outcome {
                Ok(Ok(entry)) => {
                    log::info!("audio generated in {}ms", entry.latency_ms);
                    gate.send(PipelineEvent::Synthesized(entry));
                }
                Ok(Err(err)) => {
                    log::error!("synthesis failed: {err}");
                    gate.send(PipelineEvent::SynthesisFailed(err));
                }
                Err(err) => {
                    log::error!("synthesis worker died: {err}");
                    gate.send(PipelineEvent::SynthesisFailed(PipelineError::Io(
                        std::io::Error::other("synthesis worker died"),
                    )));
                }
            }
        });

        self.synth_op = Some(InFlight { cancelled, task });
    }

    /// Stop publishing from the in-flight load, if any.
    pub fn cancel_load(&mut self) {
        if let Some(op) = self.load_op.take() {
            op.cancel();
        }
    }

    /// Stop publishing from the in-flight synthesis, if any.
    pub fn cancel_synthesis(&mut self) {
        if let Some(op) = self.synth_op.take() {
            op.cancel();
        }
    }

    /// Cancel outstanding work and release the native resource.
    ///
    /// If a blocking stage still holds the engine lock, that stage finishes
    /// first and the token is then released by the handle's own teardown;
    /// release is never skipped either way.
    pub fn shutdown(&mut self) {
        self.cancel_load();
        self.cancel_synthesis();
        if let Ok(mut engine) = self.engine.try_lock() {
            engine.unload();
        }
    }
}

impl Drop for InferenceOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_load(
    engine: &Mutex<EngineHandle>,
    source: &std::path::Path,
    cache_dir: &std::path::Path,
    reference_text: &str,
    gate: &EventGate,
) -> Result<(), PipelineError> {
    let mut engine = engine.blocking_lock();
    // A reload replaces the previous instance; its resource goes first.
    engine.unload();

    let bundle = assets::resolve(source, cache_dir, |fraction| {
        gate.send(PipelineEvent::LoadProgress(fraction));
    })?;
    engine.load(bundle)?;
    gate.send(PipelineEvent::LoadProgress(PROGRESS_INIT_DONE));
    engine.prime(reference_text)?;
    gate.send(PipelineEvent::LoadProgress(PROGRESS_PRIME_DONE));
    Ok(())
}

fn run_synthesis(
    engine: &Mutex<EngineHandle>,
    text: String,
    cache_dir: &std::path::Path,
    started: Instant,
) -> Result<AudioEntry, PipelineError> {
    let result = {
        let mut engine = engine.blocking_lock();
        engine.infer(&text)?
    };

    let path = cache_dir.join(format!("output_{}.wav", uuid::Uuid::new_v4()));
    wav::write_wav_file(&path, &WavSpec::default(), &result.samples)?;
    let latency_ms = started.elapsed().as_millis() as u64;

    Ok(AudioEntry {
        text,
        audio_path: path,
        latency_ms,
    })
}
