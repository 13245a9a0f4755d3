//! Band channel behaviour against a harness producer.
//!
//! Every test uses a region name unique to this process and test so tests
//! can run in parallel.

use fractal_shared_memory::{
    BandWriter, ChannelHandle, OpenError, ReadFault, WriteError, init_tracing,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn region_name(tag: &str) -> String {
    init_tracing();
    format!("/fractal_it_{}_{}", tag, std::process::id())
}

#[test]
fn test_open_missing_region_is_not_found() {
    let name = region_name("missing");
    let result = ChannelHandle::open(&name, 7);
    assert!(matches!(result, Err(OpenError::NotFound { .. })));

    let inert = ChannelHandle::inert(&name, 7);
    assert!(!inert.is_valid());
    let snapshot = inert.read();
    assert_eq!(snapshot.band_count(), 7);
    assert!(snapshot.is_silent());
}

#[test]
fn test_read_returns_latest_committed_snapshot() -> Result<(), WriteError> {
    let name = region_name("latest");
    let mut writer = BandWriter::create(&name, 7)?;
    let handle = ChannelHandle::open(&name, 7).unwrap();

    for round in 0..10 {
        let bands: Vec<f32> = (0..7).map(|b| round as f32 * 10.0 + b as f32 * 0.5).collect();
        writer.write_bands(&bands)?;
        let snapshot = handle.read();
        assert_eq!(snapshot.as_slice(), bands.as_slice());
        assert!(handle.is_valid());
    }
    Ok(())
}

#[test]
fn test_special_float_values_pass_through() -> Result<(), WriteError> {
    let name = region_name("special");
    let mut writer = BandWriter::create(&name, 4)?;
    let bands = [f32::NAN, f32::INFINITY, -0.0, f32::MIN_POSITIVE];
    writer.write_bands(&bands)?;

    let handle = ChannelHandle::open(&name, 4).unwrap();
    let snapshot = handle.read();
    for (read, written) in snapshot.iter().zip(bands.iter()) {
        assert_eq!(read.to_bits(), written.to_bits());
    }
    Ok(())
}

#[test]
fn test_destroyed_region_invalidates_handle_for_good() -> Result<(), WriteError> {
    let name = region_name("destroyed");
    let mut writer = BandWriter::create(&name, 7)?;
    writer.write_bands(&[1.0; 7])?;

    let handle = ChannelHandle::open(&name, 7).unwrap();
    assert_eq!(handle.read().as_slice(), &[1.0; 7]);

    writer.destroy()?;

    let snapshot = handle.read();
    assert!(snapshot.is_silent());
    assert_eq!(snapshot.band_count(), 7);
    assert!(!handle.is_valid());
    assert_eq!(handle.fault(), Some(ReadFault::Unlinked));

    // A new producer under the same name does not revive the old handle.
    let mut revived = BandWriter::create(&name, 7)?;
    revived.write_bands(&[2.0; 7])?;
    for _ in 0..3 {
        assert!(handle.read().is_silent());
        assert!(!handle.is_valid());
    }

    // A fresh handle sees the new region.
    let fresh = ChannelHandle::open(&name, 7).unwrap();
    assert_eq!(fresh.read().as_slice(), &[2.0; 7]);
    Ok(())
}

#[test]
fn test_region_too_small_is_size_mismatch() -> Result<(), WriteError> {
    let name = region_name("small");
    let _writer = BandWriter::create(&name, 7)?;

    match ChannelHandle::open(&name, 16) {
        Err(OpenError::SizeMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 64);
            assert_eq!(actual, 28);
        }
        other => panic!("expected SizeMismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_name_without_leading_slash_is_normalized() -> Result<(), WriteError> {
    let name = region_name("normalized");
    let mut writer = BandWriter::create(&name, 2)?;
    writer.write_bands(&[0.25, 0.75])?;

    let handle = ChannelHandle::open(name.trim_start_matches('/'), 2).unwrap();
    assert_eq!(handle.name(), name);
    assert_eq!(handle.read().as_slice(), &[0.25, 0.75]);
    Ok(())
}

#[test]
fn test_two_handles_agree() -> Result<(), WriteError> {
    let name = region_name("two_handles");
    let mut writer = BandWriter::create(&name, 16)?;
    let bands: Vec<f32> = (0..16).map(|b| b as f32 * 1.5).collect();
    writer.write_bands(&bands)?;

    let first = ChannelHandle::open(&name, 16).unwrap();
    let second = ChannelHandle::open(&name, 16).unwrap();
    assert_eq!(first.read(), second.read());
    assert_eq!(first.read().as_slice(), bands.as_slice());
    Ok(())
}

#[test]
fn test_concurrent_writer_never_yields_foreign_values() -> Result<(), WriteError> {
    // Each write fills every band with one of two patterns. A torn read may
    // mix the two, but every band must hold a value the writer produced.
    let name = region_name("torn");
    let mut writer = BandWriter::create(&name, 16)?;
    writer.write_bands(&[1.0; 16])?;

    let stop = Arc::new(AtomicBool::new(false));
    let producer_stop = Arc::clone(&stop);
    let producer = std::thread::spawn(move || {
        let mut flip = false;
        while !producer_stop.load(Ordering::Relaxed) {
            let value = if flip { 2.0 } else { 1.0 };
            writer.write_bands(&[value; 16]).unwrap();
            flip = !flip;
        }
        writer
    });

    let first = ChannelHandle::open(&name, 16).unwrap();
    let second = ChannelHandle::open(&name, 16).unwrap();
    for _ in 0..10_000 {
        for snapshot in [first.read(), second.read()] {
            assert_eq!(snapshot.band_count(), 16);
            assert!(snapshot.iter().all(|&v| v == 1.0 || v == 2.0));
        }
    }
    assert!(first.is_valid() && second.is_valid());

    stop.store(true, Ordering::Relaxed);
    let _writer = producer.join().unwrap();
    Ok(())
}
