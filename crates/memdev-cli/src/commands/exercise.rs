//! Scripted end-to-end exercise of a single buffer device.
//!
//! Walks the public surface in a fixed order: session lifecycle, write and
//! read round trips, every control command, and a cancelled lock wait. Each
//! check reports individually so one failure does not hide the rest. A
//! `--check` pattern narrows the run to the checks whose name contains it.

use anyhow::{bail, ensure};
use memdev::{BufferDevice, CancellationToken, DeviceConfig, DeviceError};
use tracing::info;

use crate::ExerciseArgs;

pub fn handle(args: ExerciseArgs) -> anyhow::Result<()> {
    let device = BufferDevice::new(DeviceConfig::with_capacity(args.capacity))?;
    info!("Exercising device with capacity {} bytes", args.capacity);

    let checks: Vec<(&str, fn(&BufferDevice) -> anyhow::Result<()>)> = vec![
        ("session open and close", check_session_lifecycle),
        ("write and read round trip", check_write_read),
        ("reset clears the buffer", check_reset),
        ("size query matches written length", check_size_query),
        ("flag set and get", check_flag),
        ("sequential writes append", check_sequential_writes),
        ("cancelled wait aborts the operation", check_cancellation),
    ];

    let filter = args.check.as_deref();
    let mut ran = 0usize;
    let mut failures = 0usize;
    for (name, check) in checks {
        if !name_matches(name, filter) {
            continue;
        }
        ran += 1;
        match check(&device) {
            Ok(()) => println!("[ok]   {name}"),
            Err(err) => {
                failures += 1;
                println!("[FAIL] {name}: {err:#}");
            }
        }
    }
    if let Some(pattern) = filter {
        ensure!(ran > 0, "no check name contains {pattern:?}");
    }

    let stats = device.stats();
    println!();
    println!("Device statistics:");
    println!("  reads:         {} ({} bytes)", stats.reads, stats.bytes_read);
    println!(
        "  writes:        {} ({} bytes)",
        stats.writes, stats.bytes_written
    );
    println!("  control calls: {}", stats.control_calls);
    println!("  interrupted:   {}", stats.interrupted);
    println!(
        "  sessions:      {} opened, {} still open",
        stats.sessions_opened, stats.open_sessions
    );

    if failures > 0 {
        bail!("{failures} of {ran} checks failed");
    }
    info!("All {ran} checks passed");
    Ok(())
}

fn name_matches(name: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|pattern| name.to_lowercase().contains(&pattern.to_lowercase()))
}

fn check_session_lifecycle(device: &BufferDevice) -> anyhow::Result<()> {
    let before = device.open_sessions();
    let session = device.open();
    ensure!(
        device.open_sessions() == before + 1,
        "open did not raise the session count"
    );
    drop(session);
    ensure!(
        device.open_sessions() == before,
        "close did not lower the session count"
    );
    Ok(())
}

fn check_write_read(device: &BufferDevice) -> anyhow::Result<()> {
    let mut session = device.open();
    session.reset()?;

    let message: &[u8] = b"Round-trip payload for the shared buffer device";
    let written = session.write(message)?;
    ensure!(
        written == message.len(),
        "short write: {written} of {} bytes",
        message.len()
    );

    session.rewind();
    let contents = session.read(message.len() + 16)?;
    ensure!(
        contents.as_ref() == message,
        "read returned {} bytes that do not match the write",
        contents.len()
    );
    Ok(())
}

fn check_reset(device: &BufferDevice) -> anyhow::Result<()> {
    let mut session = device.open();
    session.write(b"data that should vanish")?;
    session.reset()?;

    ensure!(
        session.buffer_size()? == 0,
        "buffer size is non-zero after reset"
    );
    session.rewind();
    let contents = session.read(16)?;
    ensure!(
        contents.is_empty(),
        "read returned {} bytes after reset",
        contents.len()
    );
    Ok(())
}

fn check_size_query(device: &BufferDevice) -> anyhow::Result<()> {
    let mut session = device.open();
    session.reset()?;

    let payload: &[u8] = b"sized payload";
    session.write(payload)?;
    let size = session.buffer_size()?;
    ensure!(
        size == payload.len(),
        "size query returned {size}, expected {}",
        payload.len()
    );
    Ok(())
}

fn check_flag(device: &BufferDevice) -> anyhow::Result<()> {
    let session = device.open();
    session.set_flag(42)?;
    ensure!(session.flag()? == 42, "flag did not round-trip 42");
    session.set_flag(-7)?;
    ensure!(
        session.flag()? == -7,
        "flag did not round-trip a negative value"
    );
    Ok(())
}

fn check_sequential_writes(device: &BufferDevice) -> anyhow::Result<()> {
    let mut session = device.open();
    session.reset()?;

    let first: &[u8] = b"first segment";
    let second: &[u8] = b", second segment";
    session.write(first)?;
    session.write(second)?;

    let size = session.buffer_size()?;
    ensure!(
        size == first.len() + second.len(),
        "size {size} does not cover both segments"
    );

    session.rewind();
    let contents = session.read(size)?;
    let mut expected = first.to_vec();
    expected.extend_from_slice(second);
    ensure!(
        contents.as_ref() == expected.as_slice(),
        "segments were not appended in order"
    );
    Ok(())
}

fn check_cancellation(device: &BufferDevice) -> anyhow::Result<()> {
    let mut session = device.open();
    let token = CancellationToken::new();
    token.cancel();

    match session.write_with_cancellation(b"never lands", Some(&token)) {
        Err(DeviceError::Interrupted) => Ok(()),
        Ok(written) => bail!("write stored {written} bytes despite a cancelled token"),
        Err(err) => bail!("expected an interrupted wait, got: {err}"),
    }
}
