//! Prelude module for common re-exports.
//!
//! ```rust
//! use fractal_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ChannelConfig, ConfigError, ConfigLoader, ConsumerSettings, FractalConfig, SharedConfig,
    posix_object_name,
};

// ─── Band Layout ────────────────────────────────────────────────────
pub use crate::band::BandSnapshot;
pub use crate::consts::{BAND_BYTES, DEFAULT_BAND_COUNT, MAX_BANDS, region_len};

/// Tick period for a given rate; a zero rate is treated as 1 Hz.
pub fn tick_period(tick_hz: u32) -> Duration {
    Duration::from_secs(1) / tick_hz.max(1)
}
