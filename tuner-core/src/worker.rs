//! # Analysis Worker Module
//!
//! Runs a [`TunerPipeline`] on a dedicated thread between a frame producer
//! (a capture callback) and a presentation consumer.
//!
//! Frames can arrive faster than they are analysed. The worker never queues
//! work: whenever it picks up a frame it skips ahead to the newest one
//! already waiting and drops the rest, since a tuner only cares about the
//! current pitch.

use crate::frame::AudioFrame;
use crate::pipeline::TunerPipeline;
use crate::{TunerReading, TuningQuality};
use crossbeam_channel::{Receiver, Sender, TrySendError, select};
use std::thread::{self, JoinHandle};

/// Producer end of a one-frame hand-off. Offering a frame while an older
/// one is still waiting replaces it, so at most one frame is ever pending.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    tx: Sender<AudioFrame>,
    // Lets the producer evict the stale frame itself.
    stale: Receiver<AudioFrame>,
}

/// Creates a slot and the receiver to hand to [`spawn_worker`].
pub fn frame_slot() -> (FrameSlot, Receiver<AudioFrame>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let slot = FrameSlot {
        tx,
        stale: rx.clone(),
    };
    (slot, rx)
}

impl FrameSlot {
    /// Leaves `frame` as the pending frame. Returns how many older frames
    /// were discarded to make room.
    pub fn offer(&self, mut frame: AudioFrame) -> usize {
        let mut replaced = 0;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return replaced,
                Err(TrySendError::Full(back)) => {
                    // The consumer may have taken it in the meantime.
                    if self.stale.try_recv().is_ok() {
                        replaced += 1;
                    }
                    frame = back;
                }
                // The slot keeps a receiver alive, so this cannot happen.
                Err(TrySendError::Disconnected(_)) => return replaced,
            }
        }
    }
}

/// What the presentation side gets after every analysed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerUpdate {
    pub reading: Option<TunerReading>,
    pub quality: TuningQuality,
    /// Strings settled so far in this session, sorted.
    pub settled: Vec<String>,
    pub active_string: Option<String>,
    pub frame_timestamp_ms: u64,
    /// Frames skipped in favour of this one.
    pub dropped_frames: usize,
}

/// Takes `first` and everything already queued behind it, keeping only the
/// newest frame. Returns it with the number of frames skipped.
pub fn latest_frame(first: AudioFrame, frames: &Receiver<AudioFrame>) -> (AudioFrame, usize) {
    let mut dropped = 0;
    let mut latest = first;
    for newer in frames.try_iter() {
        latest = newer;
        dropped += 1;
    }
    (latest, dropped)
}

/// Analyses one frame and packages the result for the presentation side.
pub fn analyse(pipeline: &mut TunerPipeline, frame: &AudioFrame, dropped_frames: usize) -> TunerUpdate {
    let reading = pipeline.process(frame);
    let tracker = pipeline.tracker();
    TunerUpdate {
        quality: TuningQuality::of(reading.as_ref()),
        settled: tracker.settled().map(str::to_owned).collect(),
        active_string: tracker.active_string().map(str::to_owned),
        frame_timestamp_ms: frame.timestamp_ms,
        dropped_frames,
        reading,
    }
}

/// Spawns the analysis thread.
///
/// The loop ends when the frame channel closes, the update receiver is
/// dropped, or anything arrives on `shutdown`. The thread hands the pipeline
/// back so the host can inspect the final session state.
pub fn spawn_worker(
    mut pipeline: TunerPipeline,
    frames: Receiver<AudioFrame>,
    shutdown: Receiver<()>,
    updates: Sender<TunerUpdate>,
) -> JoinHandle<TunerPipeline> {
    thread::spawn(move || {
        log::debug!("analysis worker started");
        loop {
            select! {
                recv(frames) -> msg => match msg {
                    Ok(frame) => {
                        let (frame, dropped) = latest_frame(frame, &frames);
                        if dropped > 0 {
                            log::debug!("dropped {dropped} stale frame(s)");
                        }
                        let update = analyse(&mut pipeline, &frame, dropped);
                        if updates.send(update).is_err() {
                            log::debug!("update receiver gone, stopping analysis");
                            break;
                        }
                    }
                    Err(_) => {
                        log::debug!("frame channel closed");
                        break;
                    }
                },
                recv(shutdown) -> _ => {
                    log::debug!("received shutdown signal");
                    break;
                },
            }
        }
        log::debug!("analysis worker finished");
        pipeline
    })
}
