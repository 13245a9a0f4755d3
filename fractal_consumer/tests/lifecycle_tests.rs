//! End-to-end lifecycle tests against a harness producer.

use fractal::config::{ChannelConfig, ConfigLoader, FractalConfig};
use fractal_consumer::{
    BandLabelPanel, BandSink, ConsumerLifecycle, LifecycleState, PeakTracker,
};
use fractal_shared_memory::{BandWriter, ChannelHandle, wait_for_ready};
use std::time::Duration;

fn private_config(tag: &str, band_count: usize) -> ChannelConfig {
    ChannelConfig {
        shm_name: format!("/fractal_e2e_{}_{}", tag, std::process::id()),
        ready_name: format!("/fractal_e2e_ready_{}_{}", tag, std::process::id()),
        band_count,
    }
}

#[test]
fn test_attach_read_detach_releases_everything_once() {
    let config = private_config("full", 7);
    let mut writer = BandWriter::create(&config.shm_name, 7).unwrap();

    let mut lifecycle = ConsumerLifecycle::new(config.clone());
    assert_eq!(
        lifecycle.attach(),
        LifecycleState::Attached { degraded: false }
    );

    let mut panel = BandLabelPanel::new();
    for round in 0..25 {
        let bands = [round as f32; 7];
        writer.write_bands(&bands).unwrap();
        let frame = lifecycle.tick(&mut [&mut panel]);
        assert!(frame.valid);
        assert_eq!(frame.bands.as_slice(), &bands);
        assert_eq!(frame.tick, round as u64 + 1);
    }
    assert_eq!(panel.labels()[6], "Band 6: 24.00");

    assert!(lifecycle.detach());
    let stats = lifecycle.stats();
    assert_eq!(stats.channel_opens, 1);
    assert_eq!(stats.channel_closes, 1);
    assert_eq!(stats.signal_opens, 1);
    assert_eq!(stats.signal_closes, 1);
    assert_eq!(stats.ticks, 25);
    assert_eq!(stats.invalid_ticks, 0);
    assert_eq!(lifecycle.state(), LifecycleState::Detached);

    // Nothing is held: a fresh handle opens the same region immediately.
    let fresh = ChannelHandle::open(&config.shm_name, 7).unwrap();
    assert_eq!(fresh.read().as_slice(), &[24.0; 7]);
}

#[test]
fn test_producer_death_switches_to_no_data() {
    let config = private_config("death", 16);
    let mut writer = BandWriter::create(&config.shm_name, 16).unwrap();
    writer.write_bands(&[0.5; 16]).unwrap();

    let mut lifecycle = ConsumerLifecycle::new(config);
    lifecycle.attach();

    let mut panel = BandLabelPanel::new();
    let mut peak = PeakTracker::default();
    assert!(lifecycle.tick(&mut [&mut panel as &mut dyn BandSink, &mut peak]).valid);

    writer.destroy().unwrap();

    for _ in 0..3 {
        let frame = lifecycle.tick(&mut [&mut panel as &mut dyn BandSink, &mut peak]);
        assert!(!frame.valid);
        assert!(frame.bands.is_silent());
        assert_eq!(frame.bands.band_count(), 16);
    }
    assert!(!panel.showing_live_data());
    assert_eq!(panel.labels()[0], "Band 0: --");
    assert_eq!(peak.live_frames, 1);
    assert_eq!(peak.dead_frames, 3);
    assert_eq!(lifecycle.stats().invalid_ticks, 3);
    assert!(lifecycle.channel().is_some_and(|c| !c.is_valid()));

    // Still released exactly once although the channel was invalid.
    lifecycle.detach();
    assert_eq!(lifecycle.stats().channel_closes, 1);
}

#[test]
fn test_late_producer_requires_reattach() {
    let config = private_config("late", 7);
    let mut lifecycle = ConsumerLifecycle::new(config.clone());
    assert_eq!(
        lifecycle.attach(),
        LifecycleState::Attached { degraded: true }
    );

    let mut writer = BandWriter::create(&config.shm_name, 7).unwrap();
    writer.write_bands(&[3.0; 7]).unwrap();

    // No reconnect in place.
    assert!(!lifecycle.tick(&mut []).valid);

    lifecycle.detach();
    assert_eq!(
        lifecycle.attach(),
        LifecycleState::Attached { degraded: false }
    );
    let frame = lifecycle.tick(&mut []);
    assert!(frame.valid);
    assert_eq!(frame.bands.as_slice(), &[3.0; 7]);

    let stats = lifecycle.stats();
    assert_eq!(stats.channel_opens, 1);
    assert_eq!(stats.signal_opens, 2);
    assert_eq!(stats.signal_closes, 1);
}

#[test]
fn test_band_count_mismatch_degrades() {
    let config = private_config("mismatch", 16);
    let _writer = BandWriter::create(&config.shm_name, 7).unwrap();

    let mut lifecycle = ConsumerLifecycle::new(config);
    assert_eq!(
        lifecycle.attach(),
        LifecycleState::Attached { degraded: true }
    );
    assert!(matches!(
        lifecycle.channel_error(),
        Some(fractal_shared_memory::OpenError::SizeMismatch { .. })
    ));
    assert!(!lifecycle.tick(&mut []).valid);
}

#[test]
fn test_producer_observes_readiness_on_attach() {
    let config = private_config("ready", 7);
    let _writer = BandWriter::create(&config.shm_name, 7).unwrap();

    let ready_name = config.ready_name.clone();
    let producer = std::thread::spawn(move || wait_for_ready(&ready_name, Duration::from_secs(5)));

    std::thread::sleep(Duration::from_millis(50));
    let mut lifecycle = ConsumerLifecycle::new(config);
    lifecycle.attach();
    assert!(lifecycle.readiness_sent());

    producer.join().unwrap().unwrap();
}

#[test]
fn test_drop_releases_handles() {
    let config = private_config("drop", 7);
    let _writer = BandWriter::create(&config.shm_name, 7).unwrap();
    {
        let mut lifecycle = ConsumerLifecycle::new(config.clone());
        lifecycle.attach();
        lifecycle.tick(&mut []);
    }
    // The readiness object was created and unlinked by the dropped lifecycle.
    let result = wait_for_ready(&config.ready_name, Duration::from_millis(150));
    assert!(result.is_err());

    assert!(ChannelHandle::open(&config.shm_name, 7).is_ok());
}

#[test]
fn test_lifecycle_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("consumer.toml");
    let shm_name = format!("/fractal_e2e_file_{}", std::process::id());
    let ready_name = format!("/fractal_e2e_file_ready_{}", std::process::id());
    std::fs::write(
        &path,
        format!(
            "[channel]\nshm_name = \"{shm_name}\"\nready_name = \"{ready_name}\"\nband_count = 7\n"
        ),
    )
    .unwrap();

    let config = FractalConfig::load(&path).unwrap();
    config.validate().unwrap();

    let mut writer = BandWriter::create(&shm_name, 7).unwrap();
    writer
        .write_bands(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7])
        .unwrap();

    let mut lifecycle = ConsumerLifecycle::new(config.channel);
    lifecycle.attach();
    let frame = lifecycle.tick(&mut []);
    assert!(frame.valid);
    assert_eq!(frame.bands[6], 0.7);
}
