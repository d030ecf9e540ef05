//! Utilities shared by the nodes.
//!
//! - Signal handling (Ctrl-C) and shutdown-aware sleeping
//! - Bounded exponential backoff ([`RetryPolicy`], [`wait_until`])
//! - Loop pacing ([`Rate`])

mod rate;
mod retry;
mod signal;

pub use rate::Rate;
pub use retry::{RetryPolicy, WaitOutcome, wait_until};
pub use signal::{setup_ctrl_c_handler, sleep_while_running};
