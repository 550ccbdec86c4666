//! Device endpoint and session lifecycle
//!
//! [`BufferDevice`] owns the shared state behind one buffer endpoint and
//! hands out [`Session`]s. There is no global instance anywhere: a device is
//! constructed explicitly and shared by cloning the handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::buffer::SharedBuffer;
use crate::config::DeviceConfig;
use crate::coordinator::{AccessCoordinator, BufferGuard, CancellationToken};
use crate::error::Result;
use crate::session::Session;
use crate::stats::{DeviceStats, StatsSnapshot};

/// State shared by a device handle and all of its sessions.
#[derive(Debug)]
pub(crate) struct DeviceShared {
    pub(crate) coordinator: AccessCoordinator,
    pub(crate) stats: DeviceStats,
    capacity: usize,
    next_session_id: AtomicU64,
}

/// Handle to one in-memory buffer endpoint.
///
/// Cloning the handle shares the same buffer; separately constructed
/// devices never alias.
#[derive(Debug, Clone)]
pub struct BufferDevice {
    shared: Arc<DeviceShared>,
}

impl BufferDevice {
    /// Create a device from a validated configuration.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        let coordinator =
            AccessCoordinator::new(SharedBuffer::new(config.capacity), config.cancel_poll);
        info!("Buffer device created with capacity {}", config.capacity);
        Ok(Self {
            shared: Arc::new(DeviceShared {
                coordinator,
                stats: DeviceStats::new(),
                capacity: config.capacity,
                next_session_id: AtomicU64::new(1),
            }),
        })
    }

    /// Create a device with the given capacity and default settings.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(DeviceConfig::with_capacity(capacity))
    }

    /// Open a new session with its cursor at zero. Never fails.
    pub fn open(&self) -> Session {
        let id = self.shared.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.shared.stats.record_session_opened();
        debug!("Session {} opened", id);
        Session::new(Arc::clone(&self.shared), id)
    }

    /// Acquire the device lock directly for a compound operation.
    ///
    /// Sessions bracket each call on their own; this entry point is for
    /// hosts that need several buffer steps to appear atomic to everyone
    /// else.
    pub fn lock(&self, token: Option<&CancellationToken>) -> Result<BufferGuard<'_>> {
        self.shared.coordinator.lock(token)
    }

    /// Storage capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of currently open sessions.
    pub fn open_sessions(&self) -> u64 {
        self.shared.stats.open_sessions.load(Ordering::Relaxed)
    }

    /// Point-in-time operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}
