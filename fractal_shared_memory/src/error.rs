//! Error types for band channel and readiness operations

use std::io;
use thiserror::Error;

/// Errors returned when opening the band channel.
///
/// These only occur at attach time; the per-tick read path never returns
/// an error (see [`ReadFault`]).
#[derive(Error, Debug)]
pub enum OpenError {
    /// No region with this name exists (producer not running yet).
    #[error("Band region not found: {name}")]
    NotFound {
        /// Region name
        name: String,
    },

    /// The region exists but may not be opened for reading.
    #[error("Access denied to band region: {name}")]
    AccessDenied {
        /// Region name
        name: String,
    },

    /// The region is smaller than the requested band count needs.
    #[error("Band region {name} holds {actual} bytes, {expected} required")]
    SizeMismatch {
        /// Region name
        name: String,
        /// Required size in bytes
        expected: usize,
        /// Actual size in bytes
        actual: usize,
    },

    /// Name is not a valid POSIX object name.
    #[error("Invalid band region name: {name:?}")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// Band count is zero or above the supported maximum.
    #[error("Invalid band count: {band_count}")]
    InvalidBandCount {
        /// Requested band count
        band_count: usize,
    },

    /// Any other OS failure.
    #[error("System error opening band region {name}: {source}")]
    Os {
        /// Region name
        name: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },
}

impl OpenError {
    pub(crate) fn from_io(name: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                name: name.to_string(),
            },
            io::ErrorKind::PermissionDenied => Self::AccessDenied {
                name: name.to_string(),
            },
            _ => Self::Os {
                name: name.to_string(),
                source,
            },
        }
    }
}

/// Errors from the readiness signal.
#[derive(Error, Debug)]
pub enum SignalError {
    /// The named signal could not be opened or created.
    #[error("Failed to create readiness signal {name}: {source}")]
    CreateFailed {
        /// Signal name
        name: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// The signal exists but posting to it failed.
    #[error("Failed to pulse readiness signal {name}: {source}")]
    PulseFailed {
        /// Signal name
        name: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },

    /// Name is not a valid POSIX object name.
    #[error("Invalid readiness signal name: {name:?}")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// No pulse observed before the deadline (producer side).
    #[error("Timed out after {waited_ms} ms waiting for readiness signal {name}")]
    WaitTimeout {
        /// Signal name
        name: String,
        /// Time spent waiting
        waited_ms: u64,
    },

    /// Waiting on or draining the signal failed.
    #[error("System error waiting on readiness signal {name}: {source}")]
    Os {
        /// Signal name
        name: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },
}

/// Errors from the producer-side [`crate::writer::BandWriter`].
#[derive(Error, Debug)]
pub enum WriteError {
    /// Name is not a valid POSIX object name.
    #[error("Invalid band region name: {name:?}")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// Band count is zero or above the supported maximum.
    #[error("Invalid band count: {band_count}")]
    InvalidBandCount {
        /// Requested band count
        band_count: usize,
    },

    /// Snapshot length differs from the region's band count.
    #[error("Snapshot has {actual} bands, region holds {expected}")]
    LengthMismatch {
        /// Region band count
        expected: usize,
        /// Snapshot band count
        actual: usize,
    },

    /// Creating, sizing, mapping or unlinking the region failed.
    #[error("System error on band region {name}: {source}")]
    Os {
        /// Region name
        name: String,
        /// Source IO error
        #[source]
        source: io::Error,
    },
}

/// Why a read invalidated its channel handle.
///
/// Never returned to callers; recorded on the handle and logged once.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFault {
    /// Querying the region descriptor failed.
    #[error("region probe failed (errno {errno:?})")]
    ProbeFailed {
        /// Raw OS error code, if any
        errno: Option<i32>,
    },

    /// The producer destroyed the region.
    #[error("region was unlinked by the producer")]
    Unlinked,

    /// The region shrank below the mapped length.
    #[error("region truncated to {len} bytes")]
    Truncated {
        /// Current region length
        len: u64,
    },

    /// The handle was closed or never opened.
    #[error("channel closed")]
    Closed,
}

/// Result type for channel open operations
pub type OpenResult<T> = Result<T, OpenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_map_to_access_denied() {
        for errno in [libc::EACCES, libc::EPERM] {
            let err = OpenError::from_io("/bands", io::Error::from_raw_os_error(errno));
            assert!(
                matches!(&err, OpenError::AccessDenied { name } if name == "/bands"),
                "errno {} mapped to {:?}",
                errno,
                err
            );
        }
    }

    #[test]
    fn missing_object_maps_to_not_found() {
        let err = OpenError::from_io("/bands", io::Error::from_raw_os_error(libc::ENOENT));
        assert!(matches!(err, OpenError::NotFound { .. }));
    }

    #[test]
    fn other_errors_keep_their_source() {
        let err = OpenError::from_io("/bands", io::Error::from_raw_os_error(libc::EMFILE));
        match err {
            OpenError::Os { source, .. } => assert_eq!(source.raw_os_error(), Some(libc::EMFILE)),
            other => panic!("expected Os, got {:?}", other),
        }
    }
}
