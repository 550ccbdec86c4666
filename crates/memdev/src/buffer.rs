//! Fixed-capacity shared byte storage
//!
//! [`SharedBuffer`] owns the bytes every session reads and writes, together
//! with the logical size watermark and the client-controlled status flag. It
//! carries no locking of its own; callers go through
//! [`AccessCoordinator`](crate::coordinator::AccessCoordinator) so that every
//! operation runs under the device lock.

use std::fmt;

use bytes::Bytes;
use tracing::trace;

use crate::error::{DeviceError, Result};

/// Fixed-capacity byte storage with a logical size and a status flag.
///
/// The storage never reallocates. `logical_size` counts the bytes considered
/// written; bytes between it and the capacity hold whatever an earlier write
/// or reset left there.
pub struct SharedBuffer {
    storage: Box<[u8]>,
    logical_size: usize,
    flag: i32,
}

impl SharedBuffer {
    /// Create zeroed storage with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            logical_size: 0,
            flag: 0,
        }
    }

    /// Storage capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Count of bytes considered written.
    pub fn size(&self) -> usize {
        self.logical_size
    }

    /// Current status flag.
    pub fn flag(&self) -> i32 {
        self.flag
    }

    /// Overwrite the status flag.
    pub fn set_flag(&mut self, value: i32) {
        self.flag = value;
    }

    /// Copy out at most `max_len` bytes starting at `offset`.
    ///
    /// Reads never cross the logical size; an offset at or past it yields an
    /// empty result rather than an error.
    pub fn read_at(&self, offset: u64, max_len: usize) -> Bytes {
        let Some(start) = offset_within(offset, self.logical_size) else {
            trace!("Read at offset {} past size {}", offset, self.logical_size);
            return Bytes::new();
        };
        let len = max_len.min(self.logical_size - start);
        trace!("Read {} bytes at offset {}", len, start);
        Bytes::copy_from_slice(&self.storage[start..start + len])
    }

    /// Copy `data` into the storage starting at `offset`.
    ///
    /// The offset is checked against the capacity before any byte moves; at
    /// or past the end nothing is written and [`DeviceError::OutOfCapacity`]
    /// comes back. A payload longer than the remaining room is truncated.
    /// The logical size rises to `offset + written` whenever the write ends
    /// past it. Returns the number of bytes stored.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        let capacity = self.capacity();
        let Some(start) = offset_within(offset, capacity) else {
            return Err(DeviceError::OutOfCapacity { offset, capacity });
        };
        let len = data.len().min(capacity - start);
        self.storage[start..start + len].copy_from_slice(&data[..len]);
        let end = start + len;
        if end > self.logical_size {
            self.logical_size = end;
        }
        trace!(
            "Wrote {} bytes at offset {}, size now {}",
            len, start, self.logical_size
        );
        Ok(len)
    }

    /// Return the buffer to its just-constructed state: storage zeroed,
    /// logical size and flag cleared.
    pub fn reset(&mut self) {
        self.storage.fill(0);
        self.logical_size = 0;
        self.flag = 0;
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("capacity", &self.capacity())
            .field("logical_size", &self.logical_size)
            .field("flag", &self.flag)
            .finish_non_exhaustive()
    }
}

/// Convert a client offset into a storage index strictly below `bound`.
fn offset_within(offset: u64, bound: usize) -> Option<usize> {
    let start = usize::try_from(offset).ok()?;
    (start < bound).then_some(start)
}
