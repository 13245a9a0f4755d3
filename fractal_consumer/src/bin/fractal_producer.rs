//! # FractalWave Simulated Producer
//!
//! Stands in for the audio-analysis process: creates the band region,
//! optionally waits for a consumer's readiness pulse, then writes a
//! synthetic per-band pattern at a fixed rate until stopped. The region is
//! destroyed on exit, which consumers observe as a read fault.
//!
//! ```bash
//! fractal_producer --bands 16 --rate-hz 60 --wait-ready 10000
//! ```

#![deny(warnings)]

use clap::Parser;
use fractal::consts::{
    BAND_RANGES_HZ, DEFAULT_BAND_COUNT, DEFAULT_READY_NAME, DEFAULT_SHM_NAME,
};
use fractal::prelude::tick_period;
use fractal_consumer::setup_tracing;
use fractal_shared_memory::{BandWriter, wait_for_ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, warn};

/// Simulated band producer for exercising the consumer
#[derive(Parser, Debug)]
#[command(name = "fractal_producer")]
#[command(version)]
#[command(about = "Writes synthetic band energies into the shared band region")]
struct Args {
    /// Shared band region name.
    #[arg(long, default_value = DEFAULT_SHM_NAME)]
    shm_name: String,

    /// Readiness signal name.
    #[arg(long, default_value = DEFAULT_READY_NAME)]
    ready_name: String,

    /// Bands per snapshot.
    #[arg(short, long, default_value_t = DEFAULT_BAND_COUNT)]
    bands: usize,

    /// Snapshots written per second.
    #[arg(long, default_value_t = 60)]
    rate_hz: u32,

    /// Wait up to this many milliseconds for the consumer's readiness pulse.
    #[arg(long, value_name = "MS")]
    wait_ready: Option<u64>,

    /// Stop after this many seconds (runs until Ctrl-C otherwise).
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Producer failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(
        if args.verbose { Level::DEBUG } else { Level::INFO },
        args.json,
    );

    let mut writer = BandWriter::create(&args.shm_name, args.bands)?;
    if args.bands == BAND_RANGES_HZ.len() {
        for (band, (lo, hi)) in BAND_RANGES_HZ.iter().enumerate() {
            debug!("Band {}: {:.2} - {:.2} Hz", band, lo, hi);
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    if let Some(ms) = args.wait_ready {
        match wait_for_ready(&args.ready_name, Duration::from_millis(ms)) {
            Ok(()) => info!("Consumer attached"),
            Err(e) => warn!("{}; producing anyway", e),
        }
    }

    let period = tick_period(args.rate_hz);
    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let started = Instant::now();
    let mut bands = vec![0.0f32; args.bands];

    while running.load(Ordering::SeqCst) && deadline.is_none_or(|d| Instant::now() < d) {
        let cycle = Instant::now();
        synthesize(&mut bands, started.elapsed().as_secs_f32());
        writer.write_bands(&bands)?;
        if let Some(remaining) = period.checked_sub(cycle.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    info!("Wrote {} snapshots", writer.writes());
    writer.destroy()?;
    Ok(())
}

/// Slow per-band sine pattern; low bands louder and slower than high bands.
fn synthesize(bands: &mut [f32], t: f32) {
    let count = bands.len().max(1) as f32;
    for (band, value) in bands.iter_mut().enumerate() {
        let position = band as f32 / count;
        let rate = 0.25 + position * 1.5;
        let gain = 1.0 - 0.6 * position;
        let phase = std::f32::consts::TAU * (rate * t + position);
        *value = gain * (0.5 + 0.5 * phase.sin());
    }
}
