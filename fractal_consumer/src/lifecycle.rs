//! Consumer lifecycle: Detached → Attaching → Attached → Detached.
//!
//! Owns the band channel and the readiness signal. Both are acquired best
//! effort on attach, read once per tick while attached, and released in a
//! fixed order (channel, then signal) on detach or drop. A failed channel
//! open leaves the lifecycle attached but degraded: the channel is never
//! read and every tick surfaces the "no data" frame.

use crate::render::{BandFrame, BandSink};
use fractal::config::ChannelConfig;
use fractal_shared_memory::{
    ChannelHandle, OpenError, ReadinessHandle, SignalError, signal_ready,
};
use tracing::{info, warn};

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No handles held. Initial and terminal state.
    Detached,
    /// Handles are being acquired.
    Attaching,
    /// Attach finished. `degraded` when the band channel failed to open.
    Attached {
        /// Channel unavailable; ticks surface "no data".
        degraded: bool,
    },
}

/// Resource and tick counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStats {
    /// Successful channel opens.
    pub channel_opens: u32,
    /// Channel releases.
    pub channel_closes: u32,
    /// Successful readiness signal opens.
    pub signal_opens: u32,
    /// Readiness signal releases.
    pub signal_closes: u32,
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks that surfaced an invalid frame.
    pub invalid_ticks: u64,
}

/// Orchestrates the band channel and readiness signal for one consumer.
pub struct ConsumerLifecycle {
    config: ChannelConfig,
    state: LifecycleState,
    channel: Option<ChannelHandle>,
    readiness: Option<ReadinessHandle>,
    channel_error: Option<OpenError>,
    signal_error: Option<SignalError>,
    stats: LifecycleStats,
}

impl ConsumerLifecycle {
    /// Create a detached lifecycle for the given channel settings.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            state: LifecycleState::Detached,
            channel: None,
            readiness: None,
            channel_error: None,
            signal_error: None,
            stats: LifecycleStats::default(),
        }
    }

    /// Acquire the channel and readiness signal.
    ///
    /// Never fails: open errors are logged once, kept for inspection, and
    /// degrade the corresponding subsystem. No-op unless detached.
    pub fn attach(&mut self) -> LifecycleState {
        if self.state != LifecycleState::Detached {
            return self.state;
        }
        self.state = LifecycleState::Attaching;
        self.channel_error = None;
        self.signal_error = None;

        match ChannelHandle::open(&self.config.shm_name, self.config.band_count) {
            Ok(channel) => {
                self.stats.channel_opens += 1;
                self.channel = Some(channel);
            }
            Err(e) => {
                warn!("Band channel unavailable, running without data: {}", e);
                self.channel_error = Some(e);
            }
        }

        match signal_ready(&self.config.ready_name) {
            Ok(readiness) => {
                self.stats.signal_opens += 1;
                self.readiness = Some(readiness);
            }
            Err(e) => {
                warn!("Readiness signal not sent: {}", e);
                self.signal_error = Some(e);
            }
        }

        let degraded = self.channel.is_none();
        self.state = LifecycleState::Attached { degraded };
        info!(
            "Consumer attached ({} bands, channel {}, readiness {})",
            self.config.band_count,
            if degraded { "degraded" } else { "live" },
            if self.readiness.is_some() { "signalled" } else { "unsent" }
        );
        self.state
    }

    /// Read the channel once and hand the frame to every sink.
    ///
    /// Degraded or detached lifecycles surface the "no data" frame without
    /// touching the channel.
    pub fn tick(&mut self, sinks: &mut [&mut dyn BandSink]) -> BandFrame {
        self.stats.ticks += 1;
        let tick = self.stats.ticks;

        let frame = match (self.state, self.channel.as_ref()) {
            (LifecycleState::Attached { degraded: false }, Some(channel)) => {
                let bands = channel.read();
                BandFrame {
                    bands,
                    valid: channel.is_valid(),
                    tick,
                }
            }
            _ => BandFrame::no_data(self.config.band_count, tick),
        };
        if !frame.valid {
            self.stats.invalid_ticks += 1;
        }

        for sink in sinks.iter_mut() {
            sink.on_frame(&frame);
        }
        frame
    }

    /// Release the channel, then the readiness signal.
    ///
    /// Runs at most once per attach; returns `false` if already detached.
    pub fn detach(&mut self) -> bool {
        if self.state == LifecycleState::Detached {
            return false;
        }
        if let Some(mut channel) = self.channel.take() {
            if channel.close() {
                self.stats.channel_closes += 1;
            }
        }
        if let Some(mut readiness) = self.readiness.take() {
            if readiness.close() {
                self.stats.signal_closes += 1;
            }
        }
        self.state = LifecycleState::Detached;
        info!(
            "Consumer detached after {} ticks ({} without data)",
            self.stats.ticks, self.stats.invalid_ticks
        );
        true
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Counters since creation.
    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    /// Channel settings.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// The open channel, if attached and not degraded.
    pub fn channel(&self) -> Option<&ChannelHandle> {
        self.channel.as_ref()
    }

    /// Whether the readiness signal was sent on the last attach.
    pub fn readiness_sent(&self) -> bool {
        self.readiness.is_some()
    }

    /// Why the channel failed to open on the last attach.
    pub fn channel_error(&self) -> Option<&OpenError> {
        self.channel_error.as_ref()
    }

    /// Why the readiness signal failed on the last attach.
    pub fn signal_error(&self) -> Option<&SignalError> {
        self.signal_error.as_ref()
    }
}

impl Drop for ConsumerLifecycle {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BandLabelPanel;

    fn private_config(tag: &str, band_count: usize) -> ChannelConfig {
        ChannelConfig {
            shm_name: format!("/fractal_lc_{}_{}", tag, std::process::id()),
            ready_name: format!("/fractal_lc_ready_{}_{}", tag, std::process::id()),
            band_count,
        }
    }

    #[test]
    fn starts_detached_and_ticks_no_data() {
        let mut lifecycle = ConsumerLifecycle::new(private_config("fresh", 7));
        assert_eq!(lifecycle.state(), LifecycleState::Detached);

        let frame = lifecycle.tick(&mut []);
        assert!(!frame.valid);
        assert_eq!(frame.bands.band_count(), 7);
        assert_eq!(lifecycle.stats().invalid_ticks, 1);
    }

    #[test]
    fn attach_without_producer_is_degraded() {
        let mut lifecycle = ConsumerLifecycle::new(private_config("degraded", 7));
        let state = lifecycle.attach();
        assert_eq!(state, LifecycleState::Attached { degraded: true });
        assert!(matches!(
            lifecycle.channel_error(),
            Some(OpenError::NotFound { .. })
        ));
        assert!(lifecycle.readiness_sent());

        let mut panel = BandLabelPanel::new();
        let frame = lifecycle.tick(&mut [&mut panel]);
        assert!(!frame.valid);
        assert!(frame.bands.is_silent());
        assert_eq!(panel.labels()[0], "Band 0: --");
    }

    #[test]
    fn attach_twice_is_noop() {
        let mut lifecycle = ConsumerLifecycle::new(private_config("twice", 7));
        lifecycle.attach();
        lifecycle.attach();
        assert_eq!(lifecycle.stats().signal_opens, 1);
    }

    #[test]
    fn detach_is_idempotent() {
        let mut lifecycle = ConsumerLifecycle::new(private_config("idem", 7));
        assert!(!lifecycle.detach());
        lifecycle.attach();
        assert!(lifecycle.detach());
        assert!(!lifecycle.detach());
        assert_eq!(lifecycle.stats().signal_closes, 1);
    }

    #[test]
    fn invalid_signal_name_does_not_block_attach() {
        let mut config = private_config("badsig", 7);
        config.ready_name = "bad/name".to_string();
        let mut lifecycle = ConsumerLifecycle::new(config);
        lifecycle.attach();
        assert!(!lifecycle.readiness_sent());
        assert!(matches!(
            lifecycle.signal_error(),
            Some(SignalError::InvalidName { .. })
        ));
        assert!(matches!(
            lifecycle.state(),
            LifecycleState::Attached { .. }
        ));
    }
}
