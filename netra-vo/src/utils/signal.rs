//! Signal handling utilities for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep inside [`sleep_while_running`].
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Set up a Ctrl-C handler that sets the returned flag to false.
///
/// # Example
/// ```ignore
/// let running = setup_ctrl_c_handler()?;
/// while running.load(Ordering::SeqCst) {
///     // ... do work ...
/// }
/// ```
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Shutdown requested");
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

/// Sleep for `duration` in short slices, returning early (with `false`)
/// once `running` is cleared.
pub fn sleep_while_running(duration: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
