//! # FractalWave Consumer
//!
//! Attaches to the producer's band channel, signals readiness, and forwards
//! one band frame per host tick to render collaborators.
//!
//! - [`lifecycle`] - attach/tick/detach state machine owning both handles
//! - [`render`] - collaborator interface and the text band panel
//!
//! ```rust,no_run
//! use fractal::config::ChannelConfig;
//! use fractal_consumer::lifecycle::ConsumerLifecycle;
//! use fractal_consumer::render::BandLabelPanel;
//!
//! let mut lifecycle = ConsumerLifecycle::new(ChannelConfig::default());
//! lifecycle.attach();
//!
//! let mut panel = BandLabelPanel::new();
//! let frame = lifecycle.tick(&mut [&mut panel]);
//! println!("{} (valid: {})", panel.summary(), frame.valid);
//!
//! lifecycle.detach();
//! ```

pub mod lifecycle;
pub mod render;

pub use lifecycle::{ConsumerLifecycle, LifecycleState, LifecycleStats};
pub use render::{BandFrame, BandLabelPanel, BandSink, PeakTracker, band_range_hz};

use fractal::config::LogLevel;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map a configured log level to a tracing level.
pub fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Install the global tracing subscriber for the binaries.
///
/// `RUST_LOG` directives are honoured; `level` is added on top.
pub fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
