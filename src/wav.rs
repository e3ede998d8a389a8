//! Canonical RIFF/WAVE encoding of raw engine output.
//!
//! The engine hands back normalized f32 samples; everything downstream
//! (playback, history, external tooling) expects a standard PCM WAV file.
//! The byte layout produced here is a contract: `RIFF` | size-8 | `WAVE` |
//! 16-byte `fmt ` sub-chunk | `data` sub-chunk with little-endian 16-bit
//! samples. Encoding is pure; file I/O is a separate wrapper.

use std::path::Path;

use crate::error::PipelineError;

/// Output sample rate of the GPT-SoVITS engine.
pub const SAMPLE_RATE: u32 = 32_000;

/// Fixed output format: mono, 16-bit, 32 kHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            channels: 1,
        }
    }
}

/// Minimal little-endian byte assembler for RIFF chunks.
///
/// Widths are explicit at the call site so the encoder reads like the
/// container description, and the assembly is testable without touching
/// the filesystem.
#[derive(Debug, Default)]
pub(crate) struct ChunkWriter {
    buf: Vec<u8>,
}

impl ChunkWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn tag(&mut self, tag: &[u8; 4]) {
        self.buf.extend_from_slice(tag);
    }

    pub(crate) fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Quantize one normalized sample to 16-bit PCM.
///
/// Clamping happens before quantization so clipping artifacts from the
/// engine never wrap to the opposite sign.
fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Encode samples into a complete WAV byte stream.
///
/// An empty sample slice still yields a valid header-only file (declared
/// RIFF size 36, data length 0).
pub fn encode(samples: &[f32], spec: &WavSpec) -> Vec<u8> {
    let bytes_per_sample = u32::from(spec.bits_per_sample / 8);
    let block_align = spec.channels * (spec.bits_per_sample / 8);
    let byte_rate = spec.sample_rate * u32::from(block_align);
    let data_len = samples.len() as u32 * bytes_per_sample;

    let mut w = ChunkWriter::with_capacity(44 + data_len as usize);
    w.tag(b"RIFF");
    w.u32(36 + data_len);
    w.tag(b"WAVE");
    w.tag(b"fmt ");
    w.u32(16);
    w.u16(1); // PCM format tag
    w.u16(spec.channels);
    w.u32(spec.sample_rate);
    w.u32(byte_rate);
    w.u16(block_align);
    w.u16(spec.bits_per_sample);
    w.tag(b"data");
    w.u32(data_len);
    for &sample in samples {
        w.i16(quantize(sample));
    }
    w.into_bytes()
}

/// Encode and write samples to `path`.
pub fn write_wav_file(path: &Path, spec: &WavSpec, samples: &[f32]) -> Result<(), PipelineError> {
    std::fs::write(path, encode(samples, spec))?;
    Ok(())
}
