//! In-memory buffer device with synchronized sessions
//!
//! This crate models a classic character-device endpoint entirely in
//! memory: one fixed-capacity byte buffer shared by any number of client
//! sessions, each with its own cursor, plus a small ioctl-style control
//! command set (reset, size query, status flag). Every operation runs under
//! a single exclusive lock whose wait can be cancelled through a token.
//!
//! # Example
//!
//! ```
//! use memdev::{BufferDevice, DeviceConfig};
//!
//! # fn main() -> memdev::Result<()> {
//! let device = BufferDevice::new(DeviceConfig::default())?;
//! let mut session = device.open();
//!
//! let written = session.write(b"Hello")?;
//! assert_eq!(written, 5);
//!
//! session.rewind();
//! let data = session.read(1024)?;
//! assert_eq!(data.as_ref(), b"Hello");
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod session;
pub mod stats;

pub use buffer::SharedBuffer;
pub use config::{DEFAULT_CAPACITY, DeviceConfig};
pub use control::{
    CONTROL_GET_FLAG, CONTROL_GET_SIZE, CONTROL_RESET, CONTROL_SET_FLAG, CommandDispatcher,
    ControlCommand,
};
pub use coordinator::{AccessCoordinator, BufferGuard, CancellationToken};
pub use device::BufferDevice;
pub use error::{DeviceError, Result};
pub use session::Session;
pub use stats::{DeviceStats, StatsSnapshot};
