//! Basic usage example for memdev
//!
//! Tours the device surface: session reads and writes, control commands,
//! buffer sharing across sessions, and a cancelled lock wait.

use std::thread;
use std::time::Duration;

use memdev::{BufferDevice, CancellationToken, DeviceConfig, DeviceError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== memdev Example ===\n");

    // Write and read through one session
    println!("1. Write and read:");
    let device = BufferDevice::new(DeviceConfig::default())?;
    let mut session = device.open();
    let written = session.write(b"Hello, device!")?;
    println!("   Wrote {written} bytes");
    session.rewind();
    let data = session.read(1024)?;
    println!("   Read back: {}", String::from_utf8_lossy(&data));

    // Control commands
    println!("\n2. Control commands:");
    println!("   Logical size: {}", session.buffer_size()?);
    session.set_flag(42)?;
    println!("   Flag after set: {}", session.flag()?);
    session.reset()?;
    println!(
        "   After reset: size {}, flag {}",
        session.buffer_size()?,
        session.flag()?
    );

    // Every session sees the one shared buffer
    println!("\n3. Shared buffer:");
    session.rewind();
    session.write(b"shared bytes")?;
    let mut second = device.open();
    let data = second.read(1024)?;
    println!("   Second session sees: {}", String::from_utf8_lossy(&data));

    // A blocked lock wait aborts once its token is cancelled
    println!("\n4. Cancellable waits:");
    let token = CancellationToken::new();
    let guard = device.lock(None)?;
    let waiter = {
        let device = device.clone();
        let token = token.clone();
        thread::spawn(move || {
            let mut session = device.open();
            session.write_with_cancellation(b"blocked", Some(&token))
        })
    };
    thread::sleep(Duration::from_millis(50));
    token.cancel();
    let result = waiter.join().map_err(|_| "waiter thread panicked")?;
    match result {
        Err(DeviceError::Interrupted) => println!("   Blocked writer was cancelled cleanly"),
        other => println!("   Unexpected outcome: {other:?}"),
    }
    drop(guard);

    // Stats
    println!("\n5. Device statistics:");
    let stats = device.stats();
    println!(
        "   {} writes, {} reads, {} control calls, {} interrupted",
        stats.writes, stats.reads, stats.control_calls, stats.interrupted
    );

    Ok(())
}
