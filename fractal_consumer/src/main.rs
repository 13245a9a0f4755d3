//! # FractalWave Consumer Binary
//!
//! Stand-in for the host render loop: attaches to the band channel, pulses
//! the readiness signal, ticks at a fixed rate, and logs the band panel.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (/FractalWaveFFT, 16 bands, 60 Hz)
//! fractal_consumer
//!
//! # Config file with CLI overrides
//! fractal_consumer --config config/consumer.toml --bands 7 -v
//!
//! # Fixed number of ticks, JSON logs
//! fractal_consumer --ticks 600 --json
//! ```

#![deny(warnings)]

use clap::Parser;
use fractal::config::{ConfigError, ConfigLoader, FractalConfig};
use fractal::prelude::tick_period;
use fractal_consumer::{
    BandLabelPanel, BandSink, ConsumerLifecycle, LifecycleState, PeakTracker, setup_tracing,
    tracing_level,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{Level, debug, error, info, warn};

/// FractalWave Consumer - reads live band energies from the producer
#[derive(Parser, Debug)]
#[command(name = "fractal_consumer")]
#[command(version)]
#[command(about = "Reads live audio band energies from shared memory and signals readiness")]
#[command(long_about = None)]
struct Args {
    /// Path to consumer configuration file (TOML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the shared band region name.
    #[arg(long, value_name = "NAME")]
    shm_name: Option<String>,

    /// Override the readiness signal name.
    #[arg(long, value_name = "NAME")]
    ready_name: Option<String>,

    /// Override the band count agreed with the producer.
    #[arg(short, long)]
    bands: Option<usize>,

    /// Override the tick rate in Hz.
    #[arg(long)]
    tick_hz: Option<u32>,

    /// Stop after this many ticks (runs until Ctrl-C otherwise).
    #[arg(long)]
    ticks: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Consumer failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args);
    let level = match (&config, args.verbose) {
        (_, true) => Level::DEBUG,
        (Ok(config), false) => tracing_level(config.shared.log_level),
        (Err(_), false) => Level::INFO,
    };
    setup_tracing(level, args.json);

    let config = config?;
    info!(
        "FractalWave consumer v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    let mut lifecycle = ConsumerLifecycle::new(config.channel.clone());
    if let LifecycleState::Attached { degraded: true } = lifecycle.attach() {
        warn!("No producer found; restart the consumer once the producer is running");
    }

    let mut panel = BandLabelPanel::new();
    let mut peak = PeakTracker::default();
    let period = tick_period(config.consumer.tick_hz);
    let log_every = config.consumer.log_every;
    let mut was_valid = None;

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        let frame = lifecycle.tick(&mut [&mut panel as &mut dyn BandSink, &mut peak]);

        if was_valid != Some(frame.valid) {
            if frame.valid {
                info!("Band data live");
            } else if was_valid.is_some() {
                warn!("Band data lost; showing no-data state");
            }
            was_valid = Some(frame.valid);
        }
        if log_every > 0 && frame.tick % log_every == 0 {
            info!("{}", panel.summary());
            if let Some((band, value)) = peak.peak {
                match panel.caption(band) {
                    Some(range) => debug!("Peak band {} ({}): {:.3}", band, range, value),
                    None => debug!("Peak band {}: {:.3}", band, value),
                }
            }
        }

        if args.ticks.is_some_and(|limit| frame.tick >= limit) {
            break;
        }
        if let Some(remaining) = period.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    lifecycle.detach();
    let stats = lifecycle.stats();
    info!(
        "FractalWave consumer shutdown complete: {} ticks, {} live, {} without data",
        stats.ticks, peak.live_frames, stats.invalid_ticks
    );
    Ok(())
}

/// Load the config file (or defaults), apply CLI overrides, validate.
fn load_config(args: &Args) -> Result<FractalConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => FractalConfig::load(path)?,
        None => FractalConfig::default(),
    };

    if let Some(name) = &args.shm_name {
        config.channel.shm_name = name.clone();
    }
    if let Some(name) = &args.ready_name {
        config.channel.ready_name = name.clone();
    }
    if let Some(bands) = args.bands {
        config.channel.band_count = bands;
    }
    if let Some(tick_hz) = args.tick_hz {
        config.consumer.tick_hz = tick_hz;
    }

    config.validate()?;
    Ok(config)
}
