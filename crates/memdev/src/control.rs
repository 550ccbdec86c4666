//! Control command decode and dispatch
//!
//! Alongside read and write, the device accepts a small out-of-band command
//! set: reset the buffer, query the logical size, and set or query the
//! status flag. Commands arrive as raw `u32` identifiers plus an optional
//! `i32` argument, the way a host environment hands them through an
//! ioctl-style boundary.

use std::fmt;

use tracing::{debug, warn};

use crate::coordinator::{AccessCoordinator, CancellationToken};
use crate::error::{DeviceError, Result};

/// Reset the buffer: contents scrubbed, size and flag cleared.
pub const CONTROL_RESET: u32 = 1;
/// Reply with the current logical size.
pub const CONTROL_GET_SIZE: u32 = 2;
/// Store the argument as the new status flag.
pub const CONTROL_SET_FLAG: u32 = 3;
/// Reply with the current status flag.
pub const CONTROL_GET_FLAG: u32 = 4;

/// Decoded control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Clear buffer contents, size, and flag
    Reset,
    /// Query the logical size
    GetSize,
    /// Replace the status flag
    SetFlag,
    /// Query the status flag
    GetFlag,
}

impl ControlCommand {
    /// Decode a raw command identifier.
    pub fn from_raw(command_id: u32) -> Option<Self> {
        match command_id {
            CONTROL_RESET => Some(Self::Reset),
            CONTROL_GET_SIZE => Some(Self::GetSize),
            CONTROL_SET_FLAG => Some(Self::SetFlag),
            CONTROL_GET_FLAG => Some(Self::GetFlag),
            _ => None,
        }
    }

    /// Raw identifier for this command.
    pub fn raw(self) -> u32 {
        match self {
            Self::Reset => CONTROL_RESET,
            Self::GetSize => CONTROL_GET_SIZE,
            Self::SetFlag => CONTROL_SET_FLAG,
            Self::GetFlag => CONTROL_GET_FLAG,
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reset => "RESET",
            Self::GetSize => "GET_SIZE",
            Self::SetFlag => "SET_FLAG",
            Self::GetFlag => "GET_FLAG",
        };
        write!(f, "{name}")
    }
}

/// Executes control commands against the shared buffer
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Run one control command under the device lock.
    ///
    /// The lock is taken before the identifier is decoded, so even a
    /// rejected command serializes with every other operation. `GET_SIZE`
    /// and `GET_FLAG` reply with a value; `RESET` and `SET_FLAG` reply with
    /// `None`. `SET_FLAG` without an argument reports
    /// [`DeviceError::InvalidBuffer`] and changes nothing.
    pub fn dispatch(
        coordinator: &AccessCoordinator,
        token: Option<&CancellationToken>,
        command_id: u32,
        arg: Option<i32>,
    ) -> Result<Option<i32>> {
        let mut buffer = coordinator.lock(token)?;
        let Some(command) = ControlCommand::from_raw(command_id) else {
            warn!("Rejected unknown control command {}", command_id);
            return Err(DeviceError::InvalidCommand(command_id));
        };
        match command {
            ControlCommand::Reset => {
                buffer.reset();
                debug!("Control {}: buffer reset", command);
                Ok(None)
            }
            ControlCommand::GetSize => {
                let size = i32::try_from(buffer.size()).unwrap_or(i32::MAX);
                debug!("Control {}: {}", command, size);
                Ok(Some(size))
            }
            ControlCommand::SetFlag => {
                let value = arg.ok_or_else(|| {
                    DeviceError::InvalidBuffer("SET_FLAG requires an argument".to_string())
                })?;
                buffer.set_flag(value);
                debug!("Control {}: {}", command, value);
                Ok(None)
            }
            ControlCommand::GetFlag => {
                let flag = buffer.flag();
                debug!("Control {}: {}", command, flag);
                Ok(Some(flag))
            }
        }
    }
}
