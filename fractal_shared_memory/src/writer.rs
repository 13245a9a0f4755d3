//! Producer-side band writer.
//!
//! The consumer never creates or writes the region; this writer exists for
//! the simulated producer binary and for test harnesses. It creates the
//! region (or reuses an existing one of the same name), resizes it to
//! exactly `band_count * 4` bytes, and overwrites it in place on every
//! write with no sequence counter.

use crate::error::WriteError;
use crate::platform::{create_region, unlink_region};
use fractal::band::{BandSnapshot, encode_band};
use fractal::config::posix_object_name;
use fractal::consts::{BAND_BYTES, MAX_BANDS, region_len};
use memmap2::{MmapMut, MmapOptions};
use std::fs::File;
use tracing::{debug, info, warn};

/// Single writer owning the band region.
pub struct BandWriter {
    name: String,
    band_count: usize,
    map: MmapMut,
    _file: File,
    destroyed: bool,
    writes: u64,
}

impl BandWriter {
    /// Create (or reopen) the region and zero it.
    pub fn create(name: &str, band_count: usize) -> Result<Self, WriteError> {
        if band_count == 0 || band_count > MAX_BANDS {
            return Err(WriteError::InvalidBandCount { band_count });
        }
        let posix_name = posix_object_name(name).ok_or_else(|| WriteError::InvalidName {
            name: name.to_string(),
        })?;
        let len = region_len(band_count);

        let os_err = |source| WriteError::Os {
            name: posix_name.clone(),
            source,
        };
        let file = create_region(&posix_name, len).map_err(os_err)?;
        // SAFETY: the object was just sized to `len` bytes and this process
        // is the only writer.
        let mut map = unsafe { MmapOptions::new().len(len).map_mut(&file) }.map_err(os_err)?;
        map.fill(0);

        info!("Created band region {} ({} bands)", posix_name, band_count);

        Ok(Self {
            name: posix_name,
            band_count,
            map,
            _file: file,
            destroyed: false,
            writes: 0,
        })
    }

    /// Overwrite the region with `snapshot`.
    pub fn write(&mut self, snapshot: &BandSnapshot) -> Result<(), WriteError> {
        self.write_bands(snapshot.as_slice())
    }

    /// Overwrite the region with raw band values.
    ///
    /// # Errors
    /// `WriteError::LengthMismatch` unless `bands.len() == band_count`.
    pub fn write_bands(&mut self, bands: &[f32]) -> Result<(), WriteError> {
        if bands.len() != self.band_count {
            return Err(WriteError::LengthMismatch {
                expected: self.band_count,
                actual: bands.len(),
            });
        }
        let base = self.map.as_mut_ptr();
        for (band, value) in bands.iter().enumerate() {
            // SAFETY: band < band_count and the page-aligned mapping holds
            // band_count * 4 bytes; each band is stored as one aligned word.
            unsafe {
                base.add(band * BAND_BYTES)
                    .cast::<u32>()
                    .write_volatile(encode_band(*value));
            }
        }
        self.writes += 1;
        Ok(())
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bands per snapshot.
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Number of completed writes.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Unlink the region. Readers holding a handle observe the fault on
    /// their next read; the name becomes free for a new region.
    pub fn destroy(mut self) -> Result<(), WriteError> {
        self.destroyed = true;
        unlink_region(&self.name).map_err(|source| WriteError::Os {
            name: self.name.clone(),
            source,
        })?;
        info!("Destroyed band region {}", self.name);
        Ok(())
    }
}

impl Drop for BandWriter {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        match unlink_region(&self.name) {
            Ok(()) => debug!("Unlinked band region {} on drop", self.name),
            Err(e) => warn!("Failed to unlink band region {}: {}", self.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_rejects_wrong_length() {
        let name = format!("/fractal_writer_len_{}", std::process::id());
        let mut writer = BandWriter::create(&name, 7).unwrap();
        assert!(matches!(
            writer.write_bands(&[1.0; 6]),
            Err(WriteError::LengthMismatch {
                expected: 7,
                actual: 6
            })
        ));
        assert_eq!(writer.writes(), 0);
        writer.write_bands(&[1.0; 7]).unwrap();
        assert_eq!(writer.writes(), 1);
    }

    #[test]
    fn create_rejects_zero_bands() {
        assert!(matches!(
            BandWriter::create("/fractal_writer_zero", 0),
            Err(WriteError::InvalidBandCount { band_count: 0 })
        ));
    }
}
