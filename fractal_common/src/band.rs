//! Band snapshot: one sample of N frequency-band energies.
//!
//! The wire format shared with the producer is exactly N consecutive
//! little-endian `f32` values with no header, so decoding is an identity
//! pass-through of bytes to floats in band order. Each band travels as one
//! aligned 32-bit word; [`decode_band`] and [`encode_band`] convert between
//! that word as loaded from memory and the band value.

use crate::consts::MAX_BANDS;
use core::ops::Deref;

/// Band value from one 32-bit word loaded from the shared region.
///
/// `word` is the native-endian load of the four wire bytes.
#[inline]
pub fn decode_band(word: u32) -> f32 {
    f32::from_bits(u32::from_le(word))
}

/// Word to store in the shared region for one band value.
#[inline]
pub fn encode_band(value: f32) -> u32 {
    value.to_bits().to_le()
}

/// Fixed-length, ordered set of band energies sampled at one instant.
///
/// Storage is inline (`heapless::Vec`) with capacity [`MAX_BANDS`]; building
/// or copying a snapshot never touches the heap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandSnapshot {
    bands: heapless::Vec<f32, MAX_BANDS>,
}

impl BandSnapshot {
    /// All-zero snapshot of `band_count` bands (clamped to [`MAX_BANDS`]).
    pub fn zeroed(band_count: usize) -> Self {
        let mut bands = heapless::Vec::new();
        for _ in 0..band_count.min(MAX_BANDS) {
            // Bounded by MAX_BANDS above.
            let _ = bands.push(0.0);
        }
        Self { bands }
    }

    /// Build a snapshot from band values. `None` if more than [`MAX_BANDS`].
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        if values.len() > MAX_BANDS {
            return None;
        }
        let mut bands = heapless::Vec::new();
        for &value in values {
            bands.push(value).ok()?;
        }
        Some(Self { bands })
    }

    /// Band values in band order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.bands
    }

    /// Number of bands.
    #[inline]
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// True if every band is exactly zero (or there are no bands).
    pub fn is_silent(&self) -> bool {
        self.bands.iter().all(|&b| b == 0.0)
    }

    /// Append one band, as the decoder in the channel does band by band.
    ///
    /// Returns the value back if the snapshot is already at capacity.
    #[inline]
    pub fn push(&mut self, value: f32) -> Result<(), f32> {
        self.bands.push(value)
    }
}

impl Deref for BandSnapshot {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.bands
    }
}
