//! Device configuration

use std::time::Duration;

use crate::error::{DeviceError, Result};

/// Default storage capacity in bytes
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default interval between cancellation checks during a blocked lock wait
pub const DEFAULT_CANCEL_POLL: Duration = Duration::from_millis(10);

/// Configuration for a [`BufferDevice`](crate::BufferDevice)
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Fixed storage capacity in bytes
    pub capacity: usize,

    /// How often a blocked lock wait re-checks its cancellation token
    pub cancel_poll: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cancel_poll: DEFAULT_CANCEL_POLL,
        }
    }
}

impl DeviceConfig {
    /// Configuration with the given capacity and default polling
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Check that the configuration can back a working device
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(DeviceError::InvalidConfig(
                "capacity must be at least one byte".to_string(),
            ));
        }
        if i32::try_from(self.capacity).is_err() {
            return Err(DeviceError::InvalidConfig(format!(
                "capacity {} cannot be reported through i32 control replies",
                self.capacity
            )));
        }
        if self.cancel_poll.is_zero() {
            return Err(DeviceError::InvalidConfig(
                "cancellation poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
