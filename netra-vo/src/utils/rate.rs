//! Fixed-rate loop pacing.

use std::thread;
use std::time::{Duration, Instant};

/// Sleeps so that successive [`Rate::sleep`] calls are one period apart.
///
/// If the caller overran by more than two periods, the schedule restarts
/// from now instead of trying to catch up.
#[derive(Debug, Clone)]
pub struct Rate {
    period: Duration,
    last: Instant,
}

impl Rate {
    /// Rate of `hz` wake-ups per second. Non-positive rates never sleep.
    pub fn new(hz: f64) -> Self {
        let period = if hz > 0.0 && hz.is_finite() {
            Duration::from_secs_f64(1.0 / hz)
        } else {
            Duration::ZERO
        };
        Self {
            period,
            last: Instant::now(),
        }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left in the current period.
    pub fn remaining(&self) -> Duration {
        self.period.saturating_sub(self.last.elapsed())
    }

    /// Sleep out the rest of the current period.
    pub fn sleep(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }

        self.last += self.period;
        let now = Instant::now();
        if now.saturating_duration_since(self.last) > self.period * 2 {
            self.last = now;
        }
    }

    /// Restart the schedule from now.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}
