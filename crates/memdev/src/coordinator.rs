//! Exclusive access bracket around the shared buffer
//!
//! Every device operation funnels through [`AccessCoordinator::lock`]. The
//! wait for a contended lock is cancellable: callers may hand in a
//! [`CancellationToken`], and the coordinator re-checks it between bounded
//! acquisition attempts. A cancelled wait surfaces
//! [`DeviceError::Interrupted`] before any buffer state is observed or
//! touched.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::buffer::SharedBuffer;
use crate::error::{DeviceError, Result};

/// Simple cancellation token shared between an operation and whoever may
/// abort it.
///
/// Cancellation is one-way and permanent; a caller retrying an interrupted
/// operation mints a fresh token.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Create a new cancellation token
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel the operation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if the operation has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Exclusive lock around the one [`SharedBuffer`] instance.
///
/// Reads lock exactly like writes; there is no reader/writer split. Waits
/// are unbounded unless a cancellation token says otherwise.
#[derive(Debug)]
pub struct AccessCoordinator {
    buffer: Mutex<SharedBuffer>,
    cancel_poll: Duration,
}

impl AccessCoordinator {
    /// Put a buffer behind the device lock.
    pub fn new(buffer: SharedBuffer, cancel_poll: Duration) -> Self {
        Self {
            buffer: Mutex::new(buffer),
            cancel_poll,
        }
    }

    /// Acquire the device lock.
    ///
    /// Without a token this blocks until the lock is free. With a token the
    /// wait proceeds in `cancel_poll` slices, checking the token before the
    /// first slice, between slices, and once more after acquisition; a
    /// cancellation observed at any of those points returns
    /// [`DeviceError::Interrupted`] with the buffer untouched.
    pub fn lock(&self, token: Option<&CancellationToken>) -> Result<BufferGuard<'_>> {
        if let Some(guard) = self.buffer.try_lock() {
            return Self::admit(guard, token);
        }
        let Some(token) = token else {
            return Ok(BufferGuard {
                inner: self.buffer.lock(),
            });
        };
        loop {
            if token.is_cancelled() {
                trace!("Lock wait cancelled before acquisition");
                return Err(DeviceError::Interrupted);
            }
            if let Some(guard) = self.buffer.try_lock_for(self.cancel_poll) {
                return Self::admit(guard, Some(token));
            }
        }
    }

    /// Hand the guard out unless the token was cancelled while the final
    /// acquisition attempt was in flight.
    fn admit<'a>(
        guard: MutexGuard<'a, SharedBuffer>,
        token: Option<&CancellationToken>,
    ) -> Result<BufferGuard<'a>> {
        if token.is_some_and(CancellationToken::is_cancelled) {
            drop(guard);
            trace!("Lock acquired but token already cancelled, backing out");
            return Err(DeviceError::Interrupted);
        }
        Ok(BufferGuard { inner: guard })
    }
}

/// Guard proving the device lock is held.
///
/// Derefs to the [`SharedBuffer`]; dropping it releases the lock.
#[derive(Debug)]
pub struct BufferGuard<'a> {
    inner: MutexGuard<'a, SharedBuffer>,
}

impl Deref for BufferGuard<'_> {
    type Target = SharedBuffer;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for BufferGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use super::*;

    fn coordinator(capacity: usize) -> AccessCoordinator {
        AccessCoordinator::new(SharedBuffer::new(capacity), Duration::from_millis(5))
    }

    #[test]
    fn test_uncontended_lock_round_trip() {
        let coordinator = coordinator(8);
        let mut guard = coordinator.lock(None).unwrap();
        guard.write_at(0, b"ab").unwrap();
        drop(guard);
        assert_eq!(coordinator.lock(None).unwrap().size(), 2);
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancelled_before_wait() {
        let coordinator = coordinator(8);
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            coordinator.lock(Some(&token)),
            Err(DeviceError::Interrupted)
        ));
    }

    #[test]
    fn test_cancel_unblocks_waiting_caller() {
        let coordinator = Arc::new(coordinator(8));
        let token = CancellationToken::new();

        let guard = coordinator.lock(None).unwrap();
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            let token = token.clone();
            thread::spawn(move || coordinator.lock(Some(&token)).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(30));
        token.cancel();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(DeviceError::Interrupted)));
        drop(guard);
    }

    #[test]
    fn test_waiter_acquires_after_release() {
        let coordinator = Arc::new(coordinator(8));
        let guard = coordinator.lock(None).unwrap();

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let token = CancellationToken::new();
                let mut guard = coordinator.lock(Some(&token)).unwrap();
                guard.write_at(0, b"x").unwrap();
            })
        };

        thread::sleep(Duration::from_millis(20));
        drop(guard);
        waiter.join().unwrap();
        assert_eq!(coordinator.lock(None).unwrap().size(), 1);
    }

    #[test]
    fn test_cancelled_wait_leaves_state_untouched() {
        let coordinator = Arc::new(coordinator(8));
        let token = CancellationToken::new();

        let guard = coordinator.lock(None).unwrap();
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            let token = token.clone();
            thread::spawn(move || {
                coordinator
                    .lock(Some(&token))
                    .map(|mut guard| guard.write_at(0, b"never").map(|_| ()))
            })
        };

        thread::sleep(Duration::from_millis(30));
        token.cancel();
        assert!(waiter.join().unwrap().is_err());

        drop(guard);
        assert_eq!(coordinator.lock(None).unwrap().size(), 0);
    }
}
