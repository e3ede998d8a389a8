//! Replay history of synthesized utterances.

use std::path::{Path, PathBuf};

/// One synthesized utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEntry {
    /// Text the audio was synthesized from.
    pub text: String,
    /// Absolute path of the generated WAV file.
    pub audio_path: PathBuf,
    /// Inference latency in milliseconds, measured through the file write.
    pub latency_ms: u64,
}

/// Newest-first, append-only record of generated audio.
///
/// Entries are never mutated or evicted: growth tracks user-initiated
/// generations only, and cleanup of the files themselves is out of scope,
/// so the store is unbounded by design. That is a known, accepted
/// limitation.
#[derive(Debug, Default)]
pub struct AudioHistoryStore {
    entries: Vec<AudioEntry>,
}

impl AudioHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from audio files already present in `dir`, typically
    /// output of earlier runs in the cache directory. The staged reference
    /// clip (`ref.wav`) is not replayable output and is skipped. Scanned
    /// entries have no recorded latency and display their file stem.
    pub fn scan_dir(dir: &Path) -> Self {
        let mut entries = Vec::new();
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            log::warn!("audio history scan skipped: cannot read {}", dir.display());
            return Self::default();
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            let is_audio = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("wav") | Some("mp3")
            );
            let is_reference = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.eq_ignore_ascii_case("ref.wav"));
            if !is_audio || is_reference {
                continue;
            }

            let text = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("recording")
                .to_string();
            entries.push(AudioEntry {
                text,
                audio_path: path,
                latency_ms: 0,
            });
        }

        log::info!("seeded audio history with {} entries", entries.len());
        Self { entries }
    }

    /// Insert `entry` at the head; all prior entries keep their order.
    pub fn record(&mut self, entry: AudioEntry) {
        self.entries.insert(0, entry);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[AudioEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
