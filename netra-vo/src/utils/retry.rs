//! Bounded exponential backoff for conditions that become true eventually.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use super::sleep_while_running;

/// Backoff schedule.
///
/// The n-th wait (1-based) lasts `initial_delay × multiplier^(n-1)`, capped
/// at `max_delay`. `max_attempts = None` retries until shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            max_attempts: Some(6),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Whether `attempt` attempts use up the budget.
    #[inline]
    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    Exhausted { attempts: u32 },
    Shutdown,
}

/// Poll `ready` until it returns true, backing off between attempts.
///
/// Every unsuccessful attempt is logged with `what` describing the awaited
/// condition. Backoff sleeps end early when `running` is cleared.
pub fn wait_until<F>(policy: &RetryPolicy, running: &AtomicBool, what: &str, mut ready: F) -> WaitOutcome
where
    F: FnMut() -> bool,
{
    let mut attempt = 0u32;
    loop {
        if !running.load(std::sync::atomic::Ordering::Relaxed) {
            return WaitOutcome::Shutdown;
        }

        attempt = attempt.saturating_add(1);
        if ready() {
            if attempt > 1 {
                log::info!("{} available after {} attempts", what, attempt);
            }
            return WaitOutcome::Ready;
        }

        if policy.exhausted(attempt) {
            log::warn!("Gave up waiting for {} after {} attempts", what, attempt);
            return WaitOutcome::Exhausted { attempts: attempt };
        }

        let delay = policy.delay_for(attempt);
        match policy.max_attempts {
            Some(max) => log::info!(
                "Waiting for {} (attempt {}/{}), retrying in {:.2}s",
                what,
                attempt,
                max,
                delay.as_secs_f64()
            ),
            None => log::info!(
                "Waiting for {} (attempt {}), retrying in {:.2}s",
                what,
                attempt,
                delay.as_secs_f64()
            ),
        }

        if !sleep_while_running(delay, running) {
            return WaitOutcome::Shutdown;
        }
    }
}
