//! Read-only band channel over a producer-owned shared memory region.
//!
//! The producer writes `band_count` little-endian `f32` values at offset 0
//! with no header and no synchronization. A read may observe a torn write;
//! the next read self-corrects, so no retry loop exists on this path.
//!
//! Failure model: open errors are returned once at attach time. After that
//! [`ChannelHandle::read`] never fails. Any fault (region unlinked,
//! truncated, descriptor unusable) returns an all-zero snapshot and
//! invalidates the handle for good; recovering means opening a new handle.

use crate::error::{OpenError, OpenResult, ReadFault};
use crate::platform::{open_region_readonly, probe_region};
use fractal::band::{BandSnapshot, decode_band};
use fractal::config::posix_object_name;
use fractal::consts::{BAND_BYTES, MAX_BANDS, region_len};
use memmap2::{Mmap, MmapOptions};
use std::cell::Cell;
use std::fs::File;
use tracing::{debug, info, warn};

/// Open mapping plus the descriptor used to probe the region.
///
/// Field order matters: the mapping is released before the descriptor.
struct MappedRegion {
    map: Mmap,
    file: File,
}

impl MappedRegion {
    /// Check the region can still back `len` bytes.
    fn probe(&self, len: usize) -> Result<(), ReadFault> {
        let probe = probe_region(&self.file).map_err(|e| ReadFault::ProbeFailed {
            errno: e.raw_os_error(),
        })?;
        if !probe.linked {
            return Err(ReadFault::Unlinked);
        }
        if probe.len < len as u64 {
            return Err(ReadFault::Truncated { len: probe.len });
        }
        Ok(())
    }
}

/// Owned, read-only handle on the shared band region.
///
/// Not `Sync`: a handle belongs to the single consumer thread that opened it.
pub struct ChannelHandle {
    name: String,
    band_count: usize,
    region: Option<MappedRegion>,
    valid: Cell<bool>,
    fault: Cell<Option<ReadFault>>,
}

impl ChannelHandle {
    /// Open an existing band region read-only.
    ///
    /// Never creates the region and never retries.
    ///
    /// # Errors
    /// - `OpenError::NotFound` if the producer has not created the region.
    /// - `OpenError::AccessDenied` if it may not be read.
    /// - `OpenError::SizeMismatch` if it is smaller than `band_count * 4` bytes.
    /// - `OpenError::InvalidName` / `OpenError::InvalidBandCount` for bad arguments.
    pub fn open(name: &str, band_count: usize) -> OpenResult<Self> {
        if band_count == 0 || band_count > MAX_BANDS {
            return Err(OpenError::InvalidBandCount { band_count });
        }
        let posix_name = posix_object_name(name).ok_or_else(|| OpenError::InvalidName {
            name: name.to_string(),
        })?;

        let file = open_region_readonly(&posix_name)
            .map_err(|e| OpenError::from_io(&posix_name, e))?;

        let expected = region_len(band_count);
        let actual = probe_region(&file)
            .map_err(|e| OpenError::from_io(&posix_name, e))?
            .len as usize;
        if actual < expected {
            return Err(OpenError::SizeMismatch {
                name: posix_name,
                expected,
                actual,
            });
        }
        if actual > expected {
            warn!(
                "Band region {} holds {} bytes, only the first {} are read",
                posix_name, actual, expected
            );
        }

        // SAFETY: read-only shared mapping of `expected` bytes, which the
        // probe above showed the object can back. Concurrent producer writes
        // are only ever observed through volatile loads in `read`.
        let map = unsafe { MmapOptions::new().len(expected).map(&file) }
            .map_err(|e| OpenError::from_io(&posix_name, e))?;

        info!("Attached to band region {} ({} bands)", posix_name, band_count);

        Ok(Self {
            name: posix_name,
            band_count,
            region: Some(MappedRegion { map, file }),
            valid: Cell::new(true),
            fault: Cell::new(None),
        })
    }

    /// Handle that was never connected: invalid from the start, reads all-zero.
    ///
    /// Surfaced by the lifecycle when [`ChannelHandle::open`] failed, so
    /// callers keep a single code path.
    pub fn inert(name: &str, band_count: usize) -> Self {
        Self {
            name: name.to_string(),
            band_count: band_count.min(MAX_BANDS),
            region: None,
            valid: Cell::new(false),
            fault: Cell::new(Some(ReadFault::Closed)),
        }
    }

    /// Snapshot the current band values.
    ///
    /// Never blocks, never retries, never fails. On a fault the handle is
    /// invalidated and an all-zero snapshot is returned; an invalid handle
    /// returns all-zero without touching the region again.
    pub fn read(&self) -> BandSnapshot {
        if !self.valid.get() {
            return BandSnapshot::zeroed(self.band_count);
        }
        let Some(region) = self.region.as_ref() else {
            self.invalidate(ReadFault::Closed);
            return BandSnapshot::zeroed(self.band_count);
        };
        if let Err(fault) = region.probe(region_len(self.band_count)) {
            self.invalidate(fault);
            return BandSnapshot::zeroed(self.band_count);
        }

        let base = region.map.as_ptr();
        let mut snapshot = BandSnapshot::default();
        for band in 0..self.band_count {
            // SAFETY: band < band_count and the mapping is band_count * 4
            // bytes long. The mapping is page-aligned, so every band is a
            // naturally aligned word and is loaded in one access.
            let raw = unsafe { base.add(band * BAND_BYTES).cast::<u32>().read_volatile() };
            // Capacity is MAX_BANDS and band_count <= MAX_BANDS.
            let _ = snapshot.push(decode_band(raw));
        }
        snapshot
    }

    fn invalidate(&self, fault: ReadFault) {
        self.valid.set(false);
        self.fault.set(Some(fault));
        warn!("Band channel {} invalidated: {}", self.name, fault);
    }

    /// False once a read has faulted, the handle was closed, or it never opened.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Fault that invalidated the handle, if any.
    pub fn fault(&self) -> Option<ReadFault> {
        self.fault.get()
    }

    /// Normalized region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bands per snapshot.
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// True while the mapping and descriptor are held.
    pub fn is_open(&self) -> bool {
        self.region.is_some()
    }

    /// Release the mapping and descriptor.
    ///
    /// Idempotent. Returns `true` if resources were released by this call.
    pub fn close(&mut self) -> bool {
        let released = self.region.take().is_some();
        self.valid.set(false);
        if self.fault.get().is_none() {
            self.fault.set(Some(ReadFault::Closed));
        }
        if released {
            debug!("Released band region {}", self.name);
        }
        released
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("name", &self.name)
            .field("band_count", &self.band_count)
            .field("open", &self.region.is_some())
            .field("valid", &self.valid.get())
            .field("fault", &self.fault.get())
            .finish()
    }
}
