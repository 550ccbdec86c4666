//! Multi-session stress runner with optional mid-run cancellation.
//!
//! Every worker thread owns a session and hammers a fixed region of the
//! shared buffer with writes, read-backs, and periodic size queries. With
//! `--cancel-after-ms` set, every other worker is cancelled mid-run to
//! exercise interrupted lock waits under contention. After the workers
//! drain, the buffer is inspected: each region must be either fully
//! stamped with its worker's fill byte or untouched, never torn.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, ensure};
use memdev::{BufferDevice, CONTROL_GET_SIZE, CancellationToken, DeviceConfig, DeviceError};
use tracing::{debug, info, warn};

use crate::StressArgs;

struct WorkerReport {
    id: usize,
    ops_done: usize,
    interrupted: bool,
}

pub fn handle(args: StressArgs) -> anyhow::Result<()> {
    ensure!(args.sessions > 0, "at least one session is required");
    ensure!(args.payload > 0, "payload length must be non-zero");
    ensure!(
        args.payload <= args.capacity,
        "payload length {} exceeds capacity {}",
        args.payload,
        args.capacity
    );

    let device = BufferDevice::new(DeviceConfig::with_capacity(args.capacity))?;
    let disjoint = args
        .sessions
        .checked_mul(args.payload)
        .is_some_and(|needed| needed <= args.capacity);
    if !disjoint {
        warn!("Worker regions overlap at this capacity; final region verification is skipped");
    }

    info!(
        "Starting {} sessions, {} ops each, {}-byte payloads against a {}-byte device",
        args.sessions, args.ops, args.payload, args.capacity
    );

    let started = Instant::now();
    let mut tokens = Vec::with_capacity(args.sessions);
    let mut workers = Vec::with_capacity(args.sessions);
    for id in 0..args.sessions {
        let token = CancellationToken::new();
        tokens.push(token.clone());

        let device = device.clone();
        let ops = args.ops;
        let payload_len = args.payload;
        let capacity = args.capacity;
        workers.push(thread::spawn(move || {
            run_worker(&device, id, ops, payload_len, capacity, &token)
        }));
    }

    if let Some(ms) = args.cancel_after_ms {
        thread::sleep(Duration::from_millis(ms));
        for token in tokens.iter().skip(1).step_by(2) {
            token.cancel();
        }
        info!(
            "Cancelled {} of {} workers after {ms} ms",
            tokens.len() / 2,
            tokens.len()
        );
    }

    let mut ops_done = 0usize;
    let mut interrupted_workers = 0usize;
    for worker in workers {
        let report = worker
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))??;
        debug!(
            "Worker {} finished {} ops (interrupted: {})",
            report.id, report.ops_done, report.interrupted
        );
        ops_done += report.ops_done;
        if report.interrupted {
            interrupted_workers += 1;
        }
    }
    let elapsed = started.elapsed();

    ensure!(
        device.open_sessions() == 0,
        "sessions left open after the run"
    );
    if disjoint {
        verify_regions(&device, args.sessions, args.payload)?;
        info!("All worker regions are consistent");
    }

    let stats = device.stats();
    println!("Stress run finished in {elapsed:.2?}");
    println!("  ops completed:   {ops_done}");
    println!("  workers stopped: {interrupted_workers} (by cancellation)");
    println!(
        "  writes:          {} ({} bytes)",
        stats.writes, stats.bytes_written
    );
    println!(
        "  reads:           {} ({} bytes)",
        stats.reads, stats.bytes_read
    );
    println!("  control calls:   {}", stats.control_calls);
    println!("  interrupted:     {}", stats.interrupted);
    Ok(())
}

fn run_worker(
    device: &BufferDevice,
    id: usize,
    ops: usize,
    payload_len: usize,
    capacity: usize,
    token: &CancellationToken,
) -> Result<WorkerReport, DeviceError> {
    let mut session = device.open();
    let payload = vec![worker_fill(id); payload_len];

    // Folds onto a valid offset when the regions cannot all fit.
    let span = capacity - payload_len + 1;
    let offset = ((id * payload_len) % span) as u64;

    let mut ops_done = 0;
    let mut interrupted = false;
    for op in 0..ops {
        session.seek(offset);
        match session.write_with_cancellation(&payload, Some(token)) {
            Ok(_) => {}
            Err(DeviceError::Interrupted) => {
                interrupted = true;
                break;
            }
            Err(err) => return Err(err),
        }

        session.seek(offset);
        match session.read_with_cancellation(payload_len, Some(token)) {
            Ok(_) => {}
            Err(DeviceError::Interrupted) => {
                interrupted = true;
                break;
            }
            Err(err) => return Err(err),
        }

        if op % 16 == 0 {
            match session.control_with_cancellation(CONTROL_GET_SIZE, None, Some(token)) {
                Ok(_) => {}
                Err(DeviceError::Interrupted) => {
                    interrupted = true;
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        ops_done += 1;
    }

    Ok(WorkerReport {
        id,
        ops_done,
        interrupted,
    })
}

/// Checks that every worker region is either fully stamped with that
/// worker's fill byte or still untouched. Writes happen under the device
/// lock, so a torn region means lost exclusivity.
fn verify_regions(device: &BufferDevice, sessions: usize, payload_len: usize) -> anyhow::Result<()> {
    let guard = device.lock(None)?;
    for id in 0..sessions {
        let start = id * payload_len;
        let region = guard.read_at(start as u64, payload_len);

        let fill = worker_fill(id);
        let stamped = region.len() == payload_len && region.iter().all(|&byte| byte == fill);
        let untouched = region.iter().all(|&byte| byte == 0);
        ensure!(
            stamped || untouched,
            "worker {id} region at offset {start} is torn"
        );
    }
    Ok(())
}

// Nonzero so an untouched region is distinguishable from a stamped one.
fn worker_fill(id: usize) -> u8 {
    (id % 251 + 1) as u8
}
