//! # Audio Capture Module
//!
//! Live microphone input through CPAL (Cross-Platform Audio Library). The
//! stream callback slices the input into frames and leaves the newest one in
//! a [`FrameSlot`] for the analysis side; the tuner core itself never touches a
//! device.
//!
//! ## Features
//! - Default input device selection
//! - Prefers mono 32-bit float at 44.1 kHz, downmixes anything wider
//! - Overlapping frames with a configurable hop

use crate::frame::{AudioSource, Framer, downmix};
use crate::worker::FrameSlot;
use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::time::Instant;

/// Sample rate requested from the device when it offers a choice.
pub const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `slot` - One-frame hand-off to the analysis worker
/// * `frame_size` - Samples per frame
/// * `hop` - Samples between the starts of consecutive frames
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate
/// * `Err(e)` - No device, no usable f32 format, or the stream failed to start
pub fn start_audio_capture(
    slot: FrameSlot,
    frame_size: usize,
    hop: usize,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("querying input formats")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, PREFERRED_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = PREFERRED_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config: cpal::StreamConfig = supported_config.with_sample_rate(cpal::SampleRate(rate)).into();
    let channels = usize::from(config.channels);

    log::info!("capturing {channels} channel(s) at {rate} Hz, {frame_size}-sample frames, hop {hop}");

    let mut framer = Framer::new(frame_size, hop, rate, AudioSource::WebMic);
    let started = Instant::now();

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let now_ms = started.elapsed().as_millis() as u64;
                let mono = downmix(data, channels);
                for frame in framer.push(&mono, now_ms) {
                    let replaced = slot.offer(frame);
                    if replaced > 0 {
                        log::trace!("replaced {replaced} unread frame(s)");
                    }
                }
            },
            |err| log::error!("an error occurred on the audio stream: {err}"),
            None,
        )
        .context("building input stream")?;

    stream.play().context("starting input stream")?;

    Ok((stream, rate))
}

/// Picks the f32 input format closest to what the tuner wants: mono first,
/// then the smallest distance to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let rate_distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels() != 1, rate_distance)
        })
}
