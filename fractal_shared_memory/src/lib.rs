//! # FractalWave Band Channel
//!
//! Cross-process telemetry between an external audio-analysis producer and a
//! rendering consumer. Two independent pieces live here:
//!
//! - [`ChannelHandle`]: read-only view of a producer-owned POSIX shared
//!   memory region holding `band_count` little-endian `f32` band energies.
//! - [`ReadinessHandle`] / [`signal_ready`]: a named binary signal the
//!   consumer pulses once so the producer knows a consumer is attached.
//!
//! The producer side ([`BandWriter`], [`wait_for_ready`]) is included for
//! the simulated producer and for test harnesses.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   Producer      │    │  Shared Memory  │    │   Consumer      │
//! │                 │    │   Region        │    │                 │
//! │ BandWriter      ├───►│ [f32; N] LE     ├───►│ ChannelHandle   │
//! │                 │    │ no header       │    │  (read-only)    │
//! └────────┬────────┘    └─────────────────┘    └────────┬────────┘
//!          │                                             │
//!          │             ┌─────────────────┐             │
//!          └─── waits ───┤ Readiness sem   │◄── pulse ───┘
//!                        └─────────────────┘
//! ```
//!
//! ## Consistency
//!
//! There is no lock and no sequence counter on the region. A read may
//! observe a torn write and return one inconsistent snapshot; the next read
//! self-corrects. The data is display telemetry, so this is accepted.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fractal_shared_memory::{ChannelHandle, OpenError, signal_ready};
//!
//! let channel = match ChannelHandle::open("/FractalWaveFFT", 16) {
//!     Ok(channel) => channel,
//!     Err(OpenError::NotFound { name }) => {
//!         eprintln!("Region '{}' not found - is the producer running?", name);
//!         ChannelHandle::inert("/FractalWaveFFT", 16)
//!     }
//!     Err(e) => return Err(e.into()),
//! };
//! let _ready = signal_ready("/FractalWaveUnityReady").ok();
//!
//! let bands = channel.read();
//! if channel.is_valid() {
//!     println!("bass: {:.2}", bands[0]);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Thread Safety
//!
//! - **ChannelHandle**: `Send`, not `Sync` - owned by one consumer thread
//! - **ReadinessHandle**: `Send`, not `Sync`
//! - **BandWriter**: single writer per region

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod platform;
pub mod readiness;
pub mod writer;

pub use channel::ChannelHandle;
pub use error::{OpenError, OpenResult, ReadFault, SignalError, WriteError};
pub use readiness::{ReadinessHandle, signal_ready, wait_for_ready};
pub use writer::BandWriter;

/// Initialize tracing for tools and tests.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
