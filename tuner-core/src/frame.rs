//! Audio frames and the slicing of a continuous sample stream into them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which microphone produced a frame. Only used to pick gating and YIN
/// thresholds; the two sources have very different noise floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    /// 16 kHz low-bitrate hardware microphone on the glasses bridge.
    BridgePcm,
    /// Software microphone at the platform's native rate.
    WebMic,
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioSource::BridgePcm => "BRIDGE",
            AudioSource::WebMic => "WEBMIC",
        })
    }
}

/// One fixed-size block of mono samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono samples, roughly in `[-1, 1]`.
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
    /// Capture time of the last sample; never decreases within a stream.
    pub timestamp_ms: u64,
    pub source: AudioSource,
}

/// Slices pushed audio into overlapping frames of `frame_size` samples,
/// advancing by `hop` samples between frames.
#[derive(Debug, Clone)]
pub struct Framer {
    frame_size: usize,
    hop: usize,
    sample_rate_hz: u32,
    source: AudioSource,
    carry: Vec<f32>,
    /// Stream position of `carry[0]`.
    consumed: u64,
    origin_ms: Option<u64>,
}

impl Framer {
    /// `hop` is clamped to `1..=frame_size`.
    pub fn new(frame_size: usize, hop: usize, sample_rate_hz: u32, source: AudioSource) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            hop: hop.clamp(1, frame_size),
            sample_rate_hz,
            source,
            carry: Vec::with_capacity(frame_size * 2),
            consumed: 0,
            origin_ms: None,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Appends `samples` received at `now_ms` and returns every frame that is
    /// now complete.
    ///
    /// Frame timestamps count from the first push, advanced by stream
    /// position rather than wall clock, so they never go backwards.
    pub fn push(&mut self, samples: &[f32], now_ms: u64) -> Vec<AudioFrame> {
        let origin_ms = *self.origin_ms.get_or_insert(now_ms);
        self.carry.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.carry.len() >= self.frame_size {
            let end = self.consumed + self.frame_size as u64;
            frames.push(AudioFrame {
                samples: self.carry[..self.frame_size].to_vec(),
                sample_rate_hz: self.sample_rate_hz,
                timestamp_ms: origin_ms + self.position_ms(end),
                source: self.source,
            });
            self.carry.drain(..self.hop);
            self.consumed += self.hop as u64;
        }
        frames
    }

    /// Drops buffered samples and restarts the stream clock.
    pub fn reset(&mut self) {
        self.carry.clear();
        self.consumed = 0;
        self.origin_ms = None;
    }

    fn position_ms(&self, samples: u64) -> u64 {
        if self.sample_rate_hz == 0 {
            return 0;
        }
        samples * 1000 / u64::from(self.sample_rate_hz)
    }
}

/// Averages interleaved multi-channel audio down to mono.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
