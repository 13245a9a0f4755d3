//! Readiness rendezvous between consumer and producer.
//!
//! The consumer opens-or-creates a named binary signal and pulses it once on
//! attach. The producer waits on the same name to learn that a consumer
//! exists. The signal carries no data and has no ordering relationship with
//! band reads. A pulse with no waiter stays pending until the first waiter
//! consumes it or the object is destroyed; pulsing a pending signal again is
//! a no-op.
//!
//! An object left behind by a consumer that exited without closing may still
//! hold a pulse. Opening drains it, and closing always unlinks the name, so
//! a pending pulse never outlives the consumer that sent it.

use crate::error::SignalError;
use crate::platform::NamedSemaphore;
use fractal::config::posix_object_name;
use fractal::consts::READY_RETRY_INTERVAL_MS;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Owned handle on the readiness signal.
pub struct ReadinessHandle {
    name: String,
    sem: Option<NamedSemaphore>,
}

/// Open-or-create the signal named `name` and pulse it once.
///
/// # Errors
/// `SignalError::CreateFailed` if the object cannot be opened or created,
/// `SignalError::PulseFailed` if it cannot be posted. Both are non-fatal to
/// the caller's data path.
pub fn signal_ready(name: &str) -> Result<ReadinessHandle, SignalError> {
    let handle = ReadinessHandle::open(name)?;
    handle.pulse()?;
    info!("Readiness signalled on {}", handle.name);
    Ok(handle)
}

impl ReadinessHandle {
    /// Open-or-create the signal without pulsing it.
    ///
    /// Pulses left pending on an existing object are discarded.
    pub fn open(name: &str) -> Result<Self, SignalError> {
        let posix_name = posix_object_name(name).ok_or_else(|| SignalError::InvalidName {
            name: name.to_string(),
        })?;
        let sem =
            NamedSemaphore::open_or_create(&posix_name).map_err(|source| {
                SignalError::CreateFailed {
                    name: posix_name.clone(),
                    source,
                }
            })?;
        if sem.created() {
            debug!("Readiness signal {} created", posix_name);
        } else {
            let mut stale = 0u32;
            while sem.try_wait().map_err(|source| SignalError::Os {
                name: posix_name.clone(),
                source,
            })? {
                stale += 1;
            }
            if stale > 0 {
                warn!(
                    "Readiness signal {} held {} stale pulse(s); discarded",
                    posix_name, stale
                );
            } else {
                debug!("Readiness signal {} opened", posix_name);
            }
        }
        Ok(Self {
            name: posix_name,
            sem: Some(sem),
        })
    }

    /// Pulse the signal. A pending pulse is not doubled.
    ///
    /// Pulsing a closed handle is a no-op.
    pub fn pulse(&self) -> Result<(), SignalError> {
        let Some(sem) = self.sem.as_ref() else {
            return Ok(());
        };
        let posted = sem.post_if_clear().map_err(|source| SignalError::PulseFailed {
            name: self.name.clone(),
            source,
        })?;
        if !posted {
            debug!("Readiness signal {} already pending", self.name);
        }
        Ok(())
    }

    /// Signal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True until [`ReadinessHandle::close`] runs.
    pub fn is_open(&self) -> bool {
        self.sem.is_some()
    }

    /// Release the OS object and unlink its name.
    ///
    /// The name is unlinked even if another consumer created it, so nothing
    /// stale stays behind. A producer already holding the object keeps it.
    /// Idempotent. Returns `true` if resources were released by this call.
    pub fn close(&mut self) -> bool {
        let Some(sem) = self.sem.take() else {
            return false;
        };
        if let Err(e) = sem.unlink() {
            // Another party may have unlinked it already.
            debug!("Readiness signal {} unlink: {}", self.name, e);
        }
        drop(sem);
        debug!("Released readiness signal {}", self.name);
        true
    }
}

impl Drop for ReadinessHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ReadinessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessHandle")
            .field("name", &self.name)
            .field("open", &self.sem.is_some())
            .finish()
    }
}

/// Producer side: wait until a consumer pulses the signal named `name`.
///
/// Opening is retried every [`READY_RETRY_INTERVAL_MS`] until the object
/// exists, then the remaining time is spent waiting for one pulse.
///
/// # Errors
/// `SignalError::WaitTimeout` if no pulse arrives before `timeout`.
pub fn wait_for_ready(name: &str, timeout: Duration) -> Result<(), SignalError> {
    let posix_name = posix_object_name(name).ok_or_else(|| SignalError::InvalidName {
        name: name.to_string(),
    })?;
    let started = Instant::now();
    let retry = Duration::from_millis(READY_RETRY_INTERVAL_MS);

    let timed_out = |started: Instant| SignalError::WaitTimeout {
        name: posix_name.clone(),
        waited_ms: started.elapsed().as_millis() as u64,
    };

    let sem = loop {
        match NamedSemaphore::open_existing(&posix_name) {
            Ok(sem) => break sem,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(timed_out(started));
                }
                std::thread::sleep(retry.min(timeout - elapsed));
            }
            Err(source) => {
                return Err(SignalError::Os {
                    name: posix_name.clone(),
                    source,
                });
            }
        }
    };

    let remaining = timeout.saturating_sub(started.elapsed());
    let pulsed = sem.timed_wait(remaining).map_err(|source| SignalError::Os {
        name: posix_name.clone(),
        source,
    })?;
    if pulsed {
        info!("Consumer ready signal received on {}", posix_name);
        Ok(())
    } else {
        warn!("Timeout waiting for consumer ready signal on {}", posix_name);
        Err(timed_out(started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_rejected() {
        assert!(matches!(
            signal_ready(""),
            Err(SignalError::InvalidName { .. })
        ));
        assert!(matches!(
            wait_for_ready("a/b", Duration::from_millis(1)),
            Err(SignalError::InvalidName { .. })
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let name = format!("/fractal_ready_close_{}", std::process::id());
        let mut handle = signal_ready(&name).unwrap();
        assert!(handle.is_open());
        assert!(handle.close());
        assert!(!handle.close());
        assert!(!handle.is_open());
        // Pulsing after close does nothing.
        assert!(handle.pulse().is_ok());
    }
}
