//! Per-client session handles
//!
//! A [`Session`] is the unit of client interaction: it holds the private
//! cursor that sequential reads and writes advance, and forwards every
//! operation to the shared buffer under the device lock. Sessions are cheap;
//! open one per worker instead of sharing one across threads.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::control::{
    CONTROL_GET_FLAG, CONTROL_GET_SIZE, CONTROL_RESET, CONTROL_SET_FLAG, CommandDispatcher,
};
use crate::coordinator::{BufferGuard, CancellationToken};
use crate::device::DeviceShared;
use crate::error::{DeviceError, Result};

/// Handle to the device with a private read/write cursor.
///
/// Dropping the session (or calling [`close`](Self::close)) releases it; the
/// shared buffer is unaffected.
#[derive(Debug)]
pub struct Session {
    shared: Arc<DeviceShared>,
    cursor: u64,
    id: u64,
}

impl Session {
    pub(crate) fn new(shared: Arc<DeviceShared>, id: u64) -> Self {
        Self {
            shared,
            cursor: 0,
            id,
        }
    }

    /// Session identifier, unique per device.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor to an absolute offset.
    ///
    /// No bound check happens here: a cursor past the logical size reads
    /// empty, and past the capacity the next write reports
    /// [`DeviceError::OutOfCapacity`].
    pub fn seek(&mut self, offset: u64) {
        self.cursor = offset;
    }

    /// Move the cursor back to the start.
    pub fn rewind(&mut self) {
        self.seek(0);
    }

    /// Read up to `max_len` bytes at the cursor, advancing it by the
    /// returned length.
    pub fn read(&mut self, max_len: usize) -> Result<Bytes> {
        self.read_with_cancellation(max_len, None)
    }

    /// Like [`read`](Self::read), but the lock wait aborts with
    /// [`DeviceError::Interrupted`] once `token` is cancelled.
    pub fn read_with_cancellation(
        &mut self,
        max_len: usize,
        token: Option<&CancellationToken>,
    ) -> Result<Bytes> {
        let buffer = self.lock(token)?;
        let data = buffer.read_at(self.cursor, max_len);
        drop(buffer);
        self.cursor += data.len() as u64;
        self.shared.stats.record_read(data.len());
        Ok(data)
    }

    /// Write `data` at the cursor, advancing it by the stored count.
    ///
    /// A payload longer than the room left is truncated; the returned count
    /// says how much actually landed.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.write_with_cancellation(data, None)
    }

    /// Like [`write`](Self::write), but the lock wait aborts with
    /// [`DeviceError::Interrupted`] once `token` is cancelled.
    pub fn write_with_cancellation(
        &mut self,
        data: &[u8],
        token: Option<&CancellationToken>,
    ) -> Result<usize> {
        let mut buffer = self.lock(token)?;
        let written = buffer.write_at(self.cursor, data)?;
        drop(buffer);
        self.cursor += written as u64;
        self.shared.stats.record_write(written);
        Ok(written)
    }

    /// Issue a control command.
    ///
    /// See [`crate::control`] for the command set. Query commands reply with
    /// a value, mutating commands with `None`.
    pub fn control(&self, command_id: u32, arg: Option<i32>) -> Result<Option<i32>> {
        self.control_with_cancellation(command_id, arg, None)
    }

    /// Like [`control`](Self::control), but the lock wait aborts with
    /// [`DeviceError::Interrupted`] once `token` is cancelled.
    pub fn control_with_cancellation(
        &self,
        command_id: u32,
        arg: Option<i32>,
        token: Option<&CancellationToken>,
    ) -> Result<Option<i32>> {
        let result =
            CommandDispatcher::dispatch(&self.shared.coordinator, token, command_id, arg);
        match &result {
            Err(DeviceError::Interrupted) => self.shared.stats.record_interrupted(),
            _ => self.shared.stats.record_control(),
        }
        result
    }

    /// Clear the buffer contents, size, and flag.
    pub fn reset(&self) -> Result<()> {
        self.control(CONTROL_RESET, None).map(|_| ())
    }

    /// Current logical size of the shared buffer.
    pub fn buffer_size(&self) -> Result<usize> {
        let reply = self.control(CONTROL_GET_SIZE, None)?;
        Ok(usize::try_from(reply.unwrap_or(0)).unwrap_or(0))
    }

    /// Replace the status flag.
    pub fn set_flag(&self, value: i32) -> Result<()> {
        self.control(CONTROL_SET_FLAG, Some(value)).map(|_| ())
    }

    /// Current status flag.
    pub fn flag(&self) -> Result<i32> {
        Ok(self.control(CONTROL_GET_FLAG, None)?.unwrap_or(0))
    }

    /// Release the session explicitly.
    pub fn close(self) {
        drop(self);
    }

    fn lock(&self, token: Option<&CancellationToken>) -> Result<BufferGuard<'_>> {
        self.shared.coordinator.lock(token).inspect_err(|_| {
            self.shared.stats.record_interrupted();
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.stats.record_session_closed();
        debug!("Session {} closed", self.id);
    }
}
