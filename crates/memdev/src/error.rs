//! Error types for buffer device operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Lock wait interrupted by cancellation")]
    Interrupted,

    #[error("Write offset {offset} is beyond capacity {capacity}")]
    OutOfCapacity { offset: u64, capacity: usize },

    #[error("Invalid caller buffer: {0}")]
    InvalidBuffer(String),

    #[error("Invalid control command: {0}")]
    InvalidCommand(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
