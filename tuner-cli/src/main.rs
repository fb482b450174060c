//! # String Tuner - Command Line Host
//!
//! Captures the default microphone, runs the tuner pipeline on a dedicated
//! thread and prints a one-line meter for every fresh reading.
//!
//! ## Architecture
//! - **Audio callback**: cpal stream slicing input into frames
//! - **Analysis thread**: `tuner_core::worker`, newest frame wins
//! - **Main thread**: throttled console output
//! - **Input thread**: stops everything on end of input (Ctrl-D)

use anyhow::{Context, Result};
use clap::Parser;
use cpal::traits::StreamTrait;
use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tuner_core::catalog::{self, Instrument, TuningSelection};
use tuner_core::notes::format_cents;
use tuner_core::worker::{self, TunerUpdate};
use tuner_core::{TunerConfig, TunerPipeline};

/// Minimum time between two printed readings.
const RENDER_INTERVAL: Duration = Duration::from_millis(70);

/// Cents covered by each half of the meter.
const BAR_RANGE_CENTS: f64 = 50.0;

#[derive(Debug, Parser)]
#[command(name = "tuner", version, about = "Real-time string instrument tuner")]
struct Args {
    /// Instrument to tune; picks its default tuning unless --tuning is given.
    #[arg(short, long, default_value = "guitar")]
    instrument: Instrument,

    /// Tuning id, e.g. gtr_drop_d. Implies its instrument.
    #[arg(short, long)]
    tuning: Option<String>,

    /// JSON file overriding pipeline settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Samples per analysis frame.
    #[arg(long)]
    frame_size: Option<usize>,

    /// Samples between consecutive frames.
    #[arg(long)]
    hop: Option<usize>,

    /// Print the tuning catalog and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list {
        list_tunings();
        return Ok(());
    }

    let selection = resolve_selection(&args)?;
    let tuning = catalog::tuning_by_id(&selection.tuning)?;

    let mut config = match &args.config {
        Some(path) => TunerConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(frame_size) = args.frame_size {
        config.frame.frame_size = frame_size;
    }
    if let Some(hop) = args.hop {
        config.frame.hop = hop;
    }

    let pipeline = TunerPipeline::new(config, tuning.clone())?;
    println!("{} | {}", selection.instrument, tuning.name);

    let (frame_slot, frame_rx) = worker::frame_slot();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let (update_tx, update_rx) = crossbeam_channel::unbounded::<TunerUpdate>();

    let (stream, sample_rate) =
        tuner_core::audio::start_audio_capture(frame_slot, config.frame.frame_size, config.frame.hop)
            .context("starting audio capture")?;
    log::info!("audio capture running at {sample_rate} Hz, press Ctrl-D to stop");

    let worker = worker::spawn_worker(pipeline, frame_rx, shutdown_rx, update_tx);

    thread::spawn(move || {
        let mut sink = Vec::new();
        let _ = std::io::stdin().read_to_end(&mut sink);
        let _ = shutdown_tx.send(());
    });

    let mut last_render: Option<Instant> = None;
    let mut last_line = String::new();
    for update in update_rx.iter() {
        let line = render(&update);
        let due = last_render.is_none_or(|t| t.elapsed() >= RENDER_INTERVAL);
        if due && line != last_line {
            println!("{line}");
            last_line = line;
            last_render = Some(Instant::now());
        }
    }

    if let Err(e) = stream.pause() {
        log::warn!("error pausing stream: {e}");
    }
    drop(stream);

    match worker.join() {
        Ok(pipeline) => {
            let settled: Vec<&str> = pipeline.tracker().settled().collect();
            println!("settled strings: {}", if settled.is_empty() { "none".to_string() } else { settled.join(" ") });
        }
        Err(_) => log::error!("analysis thread panicked"),
    }
    Ok(())
}

/// Resolves the command line to a catalog selection; a tuning id wins over
/// the instrument flag.
fn resolve_selection(args: &Args) -> Result<TuningSelection> {
    let selection = match &args.tuning {
        Some(id) => {
            let tuning = catalog::tuning_by_id(id)?;
            TuningSelection {
                instrument: tuning.instrument,
                tuning: tuning.id.clone(),
            }
        }
        None => TuningSelection {
            instrument: args.instrument,
            tuning: catalog::default_tuning_for(args.instrument).to_string(),
        },
    };
    Ok(catalog::normalize_selection(selection))
}

fn list_tunings() {
    for instrument in Instrument::ALL {
        println!("{instrument}:");
        for tuning in catalog::tunings_for_instrument(instrument) {
            let strings: Vec<&str> = tuning.strings.iter().map(|s| s.label.as_str()).collect();
            println!("  {:<16} {:<24} {}", tuning.id, tuning.name, strings.join(" "));
        }
    }
}

fn render(update: &TunerUpdate) -> String {
    let Some(reading) = &update.reading else {
        return format!("Pluck a string {}", cents_bar(0.0));
    };

    let marker = if update.settled.iter().any(|s| *s == reading.target_string) {
        "*"
    } else {
        " "
    };
    format!(
        "{marker}{:<3} {:>6.1}Hz  {:<4} {:>6.1}Hz  {:>6}c {} {:<7} {:?}",
        reading.target_string,
        reading.target_frequency_hz,
        reading.detected_note,
        reading.detected_frequency_hz,
        format_cents(reading.cents),
        cents_bar(reading.cents),
        if reading.in_tune { "IN TUNE" } else { "ADJUST" },
        reading.quality,
    )
}

/// A 21-character meter with the centre at zero cents.
fn cents_bar(cents: f64) -> String {
    const WIDTH: usize = 21;
    let center = WIDTH / 2;
    let offset = ((cents / BAR_RANGE_CENTS).clamp(-1.0, 1.0) * center as f64).round() as isize;
    let marker = (center as isize + offset) as usize;

    let bar: String = (0..WIDTH)
        .map(|i| match i {
            i if i == marker => '^',
            i if i == center => '|',
            _ => '-',
        })
        .collect();
    format!("[{bar}]")
}
