//! System-wide constants for the FractalWave workspace.
//!
//! Single source of truth for the band layout and the default names of the
//! two named OS objects shared with the producer process.

use static_assertions::const_assert;

/// Size of one band on the wire, in bytes (little-endian IEEE-754 `f32`).
pub const BAND_BYTES: usize = 4;

const_assert!(core::mem::size_of::<f32>() == BAND_BYTES);

/// Upper bound for the configurable band count.
///
/// Snapshots are stored inline with this capacity so the per-tick read
/// path never allocates.
pub const MAX_BANDS: usize = 64;

/// Band count used by the current producer build.
pub const DEFAULT_BAND_COUNT: usize = 16;

/// Band count of the earlier seven-band producer layout.
pub const LEGACY_BAND_COUNT: usize = 7;

const_assert!(DEFAULT_BAND_COUNT <= MAX_BANDS);
const_assert!(LEGACY_BAND_COUNT <= MAX_BANDS);

/// Default POSIX name of the shared band region.
pub const DEFAULT_SHM_NAME: &str = "/FractalWaveFFT";

/// Default POSIX name of the readiness semaphore.
pub const DEFAULT_READY_NAME: &str = "/FractalWaveUnityReady";

/// Longest accepted object name, excluding the leading slash (NAME_MAX).
pub const MAX_OBJECT_NAME_LEN: usize = 255;

/// Longest accepted semaphore name, excluding the leading slash.
///
/// Named semaphores live at `/dev/shm/sem.<name>`, so the `sem.` prefix
/// counts against NAME_MAX.
pub const MAX_SEMAPHORE_NAME_LEN: usize = MAX_OBJECT_NAME_LEN - 4;

/// Interval between attempts to open the readiness object on the producer side.
pub const READY_RETRY_INTERVAL_MS: u64 = 100;

/// Default consumer tick rate.
pub const DEFAULT_TICK_HZ: u32 = 60;

/// Frequency range `(min_hz, max_hz)` covered by each band of the 16-band layout.
///
/// Bands 0..=13 are log-spaced from 20 Hz to 500 Hz (ratio ≈ 1.2585);
/// bands 14 and 15 split 500 Hz to 20 kHz (ratio ≈ 6.3249).
pub const BAND_RANGES_HZ: [(f32, f32); DEFAULT_BAND_COUNT] = [
    (20.00, 25.17),
    (25.17, 31.68),
    (31.68, 39.86),
    (39.86, 50.17),
    (50.17, 63.14),
    (63.14, 79.46),
    (79.46, 100.00),
    (100.00, 125.85),
    (125.85, 158.38),
    (158.38, 199.32),
    (199.32, 250.85),
    (250.85, 315.69),
    (315.69, 397.30),
    (397.30, 500.00),
    (500.00, 3162.28),
    (3162.28, 20000.00),
];

/// Size in bytes of a region carrying `band_count` bands.
#[inline]
pub const fn region_len(band_count: usize) -> usize {
    band_count * BAND_BYTES
}
