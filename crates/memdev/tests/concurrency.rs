//! Serialization and cancellation behavior under concurrent sessions

#![allow(clippy::unwrap_used)]

use std::thread;
use std::time::Duration;

use memdev::{BufferDevice, CancellationToken, DeviceError};

#[test]
fn test_concurrent_writers_disjoint_regions() {
    let device = BufferDevice::with_capacity(256).unwrap();
    let workers: usize = 8;
    let chunk: usize = 32;

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let device = device.clone();
            thread::spawn(move || {
                let mut session = device.open();
                session.seek((worker * chunk) as u64);
                let payload = vec![b'a' + worker as u8; chunk];
                assert_eq!(session.write(&payload).unwrap(), chunk);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut session = device.open();
    let data = session.read(256).unwrap();
    assert_eq!(data.len(), 256);
    for worker in 0..workers {
        let start = worker * chunk;
        assert!(
            data[start..start + chunk]
                .iter()
                .all(|&b| b == b'a' + worker as u8)
        );
    }
}

#[test]
fn test_whole_buffer_writes_are_never_torn() {
    let device = BufferDevice::with_capacity(64).unwrap();
    let patterns: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

    let handles: Vec<_> = patterns
        .iter()
        .map(|&pattern| {
            let device = device.clone();
            thread::spawn(move || {
                let mut session = device.open();
                for _ in 0..50 {
                    session.rewind();
                    session.write(&[pattern; 64]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Whole-buffer writes serialize, so the final content is exactly one
    // writer's pattern.
    let mut session = device.open();
    let data = session.read(64).unwrap();
    assert_eq!(data.len(), 64);
    let first = data[0];
    assert!(patterns.contains(&first));
    assert!(data.iter().all(|&b| b == first));
}

#[test]
fn test_readers_never_observe_partial_writes() {
    let device = BufferDevice::with_capacity(32).unwrap();
    let mut seed = device.open();
    seed.write(&[0u8; 32]).unwrap();

    let writer = {
        let device = device.clone();
        thread::spawn(move || {
            let mut session = device.open();
            for round in 0..100u8 {
                session.rewind();
                session.write(&[round; 32]).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let device = device.clone();
            thread::spawn(move || {
                let mut session = device.open();
                for _ in 0..100 {
                    session.rewind();
                    let data = session.read(32).unwrap();
                    assert_eq!(data.len(), 32);
                    let first = data[0];
                    assert!(data.iter().all(|&b| b == first), "torn read observed");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_interleaved_writes_reach_consistent_size() {
    let device = BufferDevice::with_capacity(128).unwrap();
    let workers = 4;
    let writes_per_worker: usize = 8;
    let payload = [0xAB_u8; 4];

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let device = device.clone();
            thread::spawn(move || {
                let mut session = device.open();
                for i in 0..writes_per_worker {
                    session.seek((i * payload.len()) as u64);
                    session.write(&payload).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every worker covered the same 32 bytes, whatever the interleaving.
    let session = device.open();
    assert_eq!(session.buffer_size().unwrap(), 32);
}

#[test]
fn test_pre_cancelled_token_aborts_immediately() {
    let device = BufferDevice::with_capacity(16).unwrap();
    let mut session = device.open();
    let token = CancellationToken::new();
    token.cancel();

    let err = session
        .write_with_cancellation(b"abc", Some(&token))
        .unwrap_err();
    assert!(matches!(err, DeviceError::Interrupted));
    assert_eq!(session.position(), 0);
    assert_eq!(device.stats().interrupted, 1);

    // A fresh token lets the same session continue.
    assert_eq!(session.write(b"abc").unwrap(), 3);
}

#[test]
fn test_cancel_unblocks_waiting_session() {
    let device = BufferDevice::with_capacity(16).unwrap();
    let token = CancellationToken::new();

    let guard = device.lock(None).unwrap();

    let waiter = {
        let device = device.clone();
        let token = token.clone();
        thread::spawn(move || {
            let mut session = device.open();
            session.write_with_cancellation(b"blocked", Some(&token))
        })
    };

    // Give the waiter time to block on the held lock, then cancel it.
    thread::sleep(Duration::from_millis(50));
    token.cancel();
    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(DeviceError::Interrupted)));

    // The aborted operation wrote nothing.
    drop(guard);
    let mut session = device.open();
    assert!(session.read(16).unwrap().is_empty());
}

#[test]
fn test_cancelled_wait_then_retry_succeeds() {
    let device = BufferDevice::with_capacity(16).unwrap();
    let guard = device.lock(None).unwrap();

    let token = CancellationToken::new();
    let waiter = {
        let device = device.clone();
        let token = token.clone();
        thread::spawn(move || {
            let mut session = device.open();
            let first = session.write_with_cancellation(b"first", Some(&token));
            // Retry with a fresh token once the holder lets go.
            let second =
                session.write_with_cancellation(b"retry", Some(&CancellationToken::new()));
            (first, second)
        })
    };

    thread::sleep(Duration::from_millis(50));
    token.cancel();
    thread::sleep(Duration::from_millis(50));
    drop(guard);

    let (first, second) = waiter.join().unwrap();
    assert!(matches!(first, Err(DeviceError::Interrupted)));
    assert_eq!(second.unwrap(), 5);
}

#[test]
fn test_cancelled_control_leaves_state_untouched() {
    let device = BufferDevice::with_capacity(16).unwrap();
    let session = device.open();
    session.set_flag(5).unwrap();

    let guard = device.lock(None).unwrap();
    let token = CancellationToken::new();

    let waiter = {
        let device = device.clone();
        let token = token.clone();
        thread::spawn(move || {
            let session = device.open();
            session.control_with_cancellation(memdev::CONTROL_RESET, None, Some(&token))
        })
    };

    thread::sleep(Duration::from_millis(50));
    token.cancel();
    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(DeviceError::Interrupted)));

    drop(guard);
    assert_eq!(session.flag().unwrap(), 5);
}
