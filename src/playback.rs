//! Single-session audio playback.
//!
//! At most one playback session exists at any time: each `play` stops and
//! fully releases the previous session before opening the next. Backend
//! problems surface as [`PipelineError::Playback`] without poisoning the
//! controller; the next `play` starts from a clean slate.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::PipelineError;

/// Informational diagnostic some playback backends emit mid-stream that
/// carries no actionable failure. Logged and ignored, unlike genuine
/// errors.
const BENIGN_INFO_CODE: i32 = 211;

/// Typed notice drained from a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackNotice {
    /// Backend diagnostic chatter.
    Info { code: i32, detail: i32 },
    /// Genuine device/codec error.
    Error { message: String },
    /// The session played its source to the end.
    Completed,
}

/// One live audio output session.
///
/// Dropping a session must release its device resources even when `stop`
/// was never called.
pub trait AudioSession {
    fn stop(&mut self);
    /// Notices accumulated since the last poll.
    fn drain_notices(&mut self) -> Vec<PlaybackNotice>;
}

/// Opens playback sessions on some audio output.
pub trait AudioBackend {
    fn start(&self, path: &Path) -> Result<Box<dyn AudioSession>, PipelineError>;
}

/// Default backend over the system audio output.
pub struct RodioBackend;

struct RodioSession {
    sink: rodio::Sink,
    // Kept alive for the duration of the session; dropping it tears down
    // the device stream.
    _stream: rodio::OutputStream,
    completed: bool,
}

impl AudioSession for RodioSession {
    fn stop(&mut self) {
        self.sink.stop();
    }

    fn drain_notices(&mut self) -> Vec<PlaybackNotice> {
        if !self.completed && self.sink.empty() {
            self.completed = true;
            return vec![PlaybackNotice::Completed];
        }
        Vec::new()
    }
}

impl AudioBackend for RodioBackend {
    fn start(&self, path: &Path) -> Result<Box<dyn AudioSession>, PipelineError> {
        let stream = rodio::OutputStreamBuilder::open_default_stream()
            .map_err(|e| PipelineError::Playback(format!("no audio output: {e}")))?;
        let sink = rodio::Sink::connect_new(stream.mixer());

        let file = File::open(path)
            .map_err(|e| PipelineError::Playback(format!("cannot open {}: {e}", path.display())))?;
        let source = rodio::Decoder::new(BufReader::new(file)).map_err(|e| {
            PipelineError::Playback(format!("cannot decode {}: {e}", path.display()))
        })?;
        sink.append(source);

        Ok(Box::new(RodioSession {
            sink,
            _stream: stream,
            completed: false,
        }))
    }
}

/// Owns the single playback session, replacing it on each new request.
pub struct PlaybackController {
    backend: Box<dyn AudioBackend>,
    session: Option<Box<dyn AudioSession>>,
    completed: bool,
}

impl PlaybackController {
    /// Controller over the system audio output.
    pub fn new() -> Self {
        Self::with_backend(Box::new(RodioBackend))
    }

    pub fn with_backend(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            session: None,
            completed: false,
        }
    }

    /// Play the file at `path`, replacing any active session.
    ///
    /// The previous session is stopped and released before the new one is
    /// constructed. If opening the new session fails, the controller is
    /// left idle and remains usable.
    pub fn play(&mut self, path: &Path) -> Result<(), PipelineError> {
        if let Some(mut old) = self.session.take() {
            old.stop();
        }
        self.completed = false;

        let session = self.backend.start(path)?;
        self.session = Some(session);
        log::info!("playing {}", path.display());
        Ok(())
    }

    /// Stop and release the active session, if any.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.completed = false;
    }

    /// True while a session exists and has not completed naturally.
    pub fn is_active(&self) -> bool {
        self.session.is_some() && !self.completed
    }

    /// Process pending backend notices.
    ///
    /// Informational code 211 is known noise and is dropped after a log
    /// line. A genuine error tears the session down and is returned; the
    /// controller accepts the next `play` afterwards. Natural completion
    /// leaves the session allocated but idle.
    pub fn poll(&mut self) -> Option<PipelineError> {
        let session = self.session.as_mut()?;

        let mut failure = None;
        for notice in session.drain_notices() {
            match notice {
                PlaybackNotice::Info {
                    code: BENIGN_INFO_CODE,
                    detail,
                } => {
                    log::warn!("unrecognized playback message (211, {detail}) - ignoring");
                }
                PlaybackNotice::Info { code, detail } => {
                    log::info!("playback info: code={code}, detail={detail}");
                }
                PlaybackNotice::Error { message } => {
                    log::error!("playback error: {message}");
                    failure.get_or_insert(PipelineError::Playback(message));
                }
                PlaybackNotice::Completed => {
                    log::info!("playback completed");
                    self.completed = true;
                }
            }
        }

        if failure.is_some() {
            if let Some(mut session) = self.session.take() {
                session.stop();
            }
        }
        failure
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
