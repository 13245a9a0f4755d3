//! Render collaborator interface.
//!
//! Downstream passes (blur, ray-march visualizer, text overlay) receive one
//! [`BandFrame`] per tick. They must tolerate invalid or all-zero frames and
//! must not assume samples are monotonic or timestamped.

use fractal::band::BandSnapshot;
use fractal::consts::BAND_RANGES_HZ;
use std::fmt::Write as _;

/// One tick's worth of band data handed to collaborators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandFrame {
    /// Band energies, `band_count` long. All-zero when `valid` is false.
    pub bands: BandSnapshot,
    /// False when the channel is degraded, faulted or detached.
    pub valid: bool,
    /// Tick counter of the lifecycle that produced the frame.
    pub tick: u64,
}

impl BandFrame {
    /// Constant "no data" frame.
    pub fn no_data(band_count: usize, tick: u64) -> Self {
        Self {
            bands: BandSnapshot::zeroed(band_count),
            valid: false,
            tick,
        }
    }
}

/// Consumer of per-tick band frames.
pub trait BandSink {
    /// Called once per tick, after the channel read.
    fn on_frame(&mut self, frame: &BandFrame);
}

/// Frequency range of `index` for the standard 16-band layout.
///
/// Other band counts carry no range table.
pub fn band_range_hz(index: usize, band_count: usize) -> Option<(f32, f32)> {
    if band_count != BAND_RANGES_HZ.len() {
        return None;
    }
    BAND_RANGES_HZ.get(index).copied()
}

/// Text overlay: one label per band.
///
/// Valid frames render as `Band {i}: {value:.2}`; invalid frames render a
/// distinguishable `Band {i}: --` instead of zeros.
#[derive(Debug, Default)]
pub struct BandLabelPanel {
    labels: Vec<String>,
    valid: bool,
}

impl BandLabelPanel {
    /// Panel with no labels until the first frame arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current labels in band order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether the last frame carried live data.
    pub fn showing_live_data(&self) -> bool {
        self.valid
    }

    /// Frequency caption for a band, e.g. `20-25 Hz`, when the layout has one.
    pub fn caption(&self, index: usize) -> Option<String> {
        band_range_hz(index, self.labels.len()).map(|(lo, hi)| format!("{:.0}-{:.0} Hz", lo, hi))
    }

    /// Labels joined on one line, for log output.
    pub fn summary(&self) -> String {
        self.labels.join(" | ")
    }
}

impl BandSink for BandLabelPanel {
    fn on_frame(&mut self, frame: &BandFrame) {
        let count = frame.bands.band_count();
        // Reuse label buffers; only the band count changing reallocates.
        self.labels.resize_with(count, String::new);
        for (index, label) in self.labels.iter_mut().enumerate() {
            label.clear();
            if frame.valid {
                let _ = write!(label, "Band {}: {:.2}", index, frame.bands[index]);
            } else {
                let _ = write!(label, "Band {}: --", index);
            }
        }
        self.valid = frame.valid;
    }
}

/// Tracks the loudest band over time, e.g. to drive a pulsing visual.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PeakTracker {
    /// Index and value of the loudest band in the last valid frame.
    pub peak: Option<(usize, f32)>,
    /// Valid frames seen.
    pub live_frames: u64,
    /// Invalid frames seen.
    pub dead_frames: u64,
}

impl BandSink for PeakTracker {
    fn on_frame(&mut self, frame: &BandFrame) {
        if !frame.valid {
            self.dead_frames += 1;
            return;
        }
        self.live_frames += 1;
        self.peak = frame
            .bands
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[f32], valid: bool) -> BandFrame {
        BandFrame {
            bands: BandSnapshot::from_slice(values).unwrap(),
            valid,
            tick: 1,
        }
    }

    #[test]
    fn panel_formats_live_values() {
        let mut panel = BandLabelPanel::new();
        panel.on_frame(&frame(&[0.5, 1.234, 10.0], true));
        assert_eq!(
            panel.labels(),
            &["Band 0: 0.50", "Band 1: 1.23", "Band 2: 10.00"]
        );
        assert!(panel.showing_live_data());
    }

    #[test]
    fn panel_shows_no_data_state() {
        let mut panel = BandLabelPanel::new();
        panel.on_frame(&BandFrame::no_data(2, 0));
        assert_eq!(panel.labels(), &["Band 0: --", "Band 1: --"]);
        assert!(!panel.showing_live_data());
        assert_eq!(panel.summary(), "Band 0: -- | Band 1: --");
    }

    #[test]
    fn panel_follows_band_count_changes() {
        let mut panel = BandLabelPanel::new();
        panel.on_frame(&frame(&[1.0; 16], true));
        assert_eq!(panel.labels().len(), 16);
        panel.on_frame(&frame(&[1.0; 7], true));
        assert_eq!(panel.labels().len(), 7);
    }

    #[test]
    fn captions_only_for_standard_layout() {
        let mut panel = BandLabelPanel::new();
        panel.on_frame(&frame(&[0.0; 16], true));
        assert_eq!(panel.caption(0).as_deref(), Some("20-25 Hz"));
        assert_eq!(panel.caption(16), None);

        panel.on_frame(&frame(&[0.0; 7], true));
        assert_eq!(panel.caption(0), None);
        assert_eq!(band_range_hz(15, 16).map(|r| r.1), Some(20000.0));
    }

    #[test]
    fn peak_tracker_ignores_invalid_frames() {
        let mut tracker = PeakTracker::default();
        tracker.on_frame(&frame(&[0.1, 0.9, 0.3], true));
        assert_eq!(tracker.peak, Some((1, 0.9)));

        tracker.on_frame(&BandFrame::no_data(3, 2));
        assert_eq!(tracker.peak, Some((1, 0.9)));
        assert_eq!(tracker.live_frames, 1);
        assert_eq!(tracker.dead_frames, 1);
    }

    #[test]
    fn peak_tracker_skips_non_finite_bands() {
        let mut tracker = PeakTracker::default();
        tracker.on_frame(&frame(&[f32::NAN, 0.2, f32::INFINITY], true));
        assert_eq!(tracker.peak, Some((1, 0.2)));
    }
}
