//! Operation counters for a running device

use std::sync::atomic::{AtomicU64, Ordering};

/// Device-level counters, updated lock-free from every session.
#[derive(Debug, Default)]
pub struct DeviceStats {
    /// Completed read operations
    pub reads: AtomicU64,
    /// Completed write operations
    pub writes: AtomicU64,
    /// Bytes handed out by reads
    pub bytes_read: AtomicU64,
    /// Bytes stored by writes
    pub bytes_written: AtomicU64,
    /// Control commands processed, including rejected ones
    pub control_calls: AtomicU64,
    /// Operations aborted by a cancelled lock wait
    pub interrupted: AtomicU64,
    /// Sessions opened over the device lifetime
    pub sessions_opened: AtomicU64,
    /// Sessions currently open
    pub open_sessions: AtomicU64,
}

impl DeviceStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, bytes: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_control(&self) {
        self.control_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.open_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_session_closed(&self) {
        self.open_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    /// Copy the counters into a plain snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            control_calls: self.control_calls.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            open_sessions: self.open_sessions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`DeviceStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Completed read operations
    pub reads: u64,
    /// Completed write operations
    pub writes: u64,
    /// Bytes handed out by reads
    pub bytes_read: u64,
    /// Bytes stored by writes
    pub bytes_written: u64,
    /// Control commands processed, including rejected ones
    pub control_calls: u64,
    /// Operations aborted by a cancelled lock wait
    pub interrupted: u64,
    /// Sessions opened over the device lifetime
    pub sessions_opened: u64,
    /// Sessions currently open
    pub open_sessions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = DeviceStats::new();
        stats.record_read(10);
        stats.record_read(5);
        stats.record_write(3);
        stats.record_control();
        stats.record_interrupted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.reads, 2);
        assert_eq!(snapshot.bytes_read, 15);
        assert_eq!(snapshot.writes, 1);
        assert_eq!(snapshot.bytes_written, 3);
        assert_eq!(snapshot.control_calls, 1);
        assert_eq!(snapshot.interrupted, 1);
    }

    #[test]
    fn test_session_gauge_follows_open_close() {
        let stats = DeviceStats::new();
        stats.record_session_opened();
        stats.record_session_opened();
        stats.record_session_closed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sessions_opened, 2);
        assert_eq!(snapshot.open_sessions, 1);
    }
}
