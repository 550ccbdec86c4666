//! memdev CLI library
//!
//! This library provides the command implementations for the `memdev` CLI
//! tool: a scripted end-to-end exercise of a buffer device and a
//! multi-session stress runner.

pub mod commands;

use clap::Args;
use memdev::DEFAULT_CAPACITY;

/// Arguments for the scripted exercise run
#[derive(Args, Debug)]
pub struct ExerciseArgs {
    /// Buffer capacity in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Run only the checks whose name contains this pattern
    #[arg(long, value_name = "NAME")]
    pub check: Option<String>,
}

/// Arguments for the stress runner
#[derive(Args, Debug)]
pub struct StressArgs {
    /// Buffer capacity in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Number of concurrent sessions
    #[arg(short, long, default_value_t = 4)]
    pub sessions: usize,

    /// Operations per session
    #[arg(short, long, default_value_t = 64)]
    pub ops: usize,

    /// Payload length per write in bytes
    #[arg(short, long, default_value_t = 32)]
    pub payload: usize,

    /// Cancel every other session after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub cancel_after_ms: Option<u64>,
}
