//! Fixed-count polling.
//!
//! Used by the test-results long task: ask the history store up to
//! `attempts` times, sleeping a fixed `interval` in between. There is no
//! backoff and no jitter.

use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Total time a fully exhausted poll spends sleeping.
    pub fn budget(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

/// Something that can wait. Tests pass a recorder instead of really sleeping.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, d: Duration);
}

/// Blocks the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Call `probe(attempt)` (1-based) until it yields `Some`, at most
/// `policy.attempts` times. Errors from `probe` stop the poll immediately.
pub fn poll<T, F>(policy: PollPolicy, sleeper: &dyn Sleeper, mut probe: F) -> Result<Option<T>>
where
    F: FnMut(u32) -> Result<Option<T>>,
{
    for attempt in 1..=policy.attempts {
        if let Some(found) = probe(attempt)? {
            return Ok(Some(found));
        }
        if attempt < policy.attempts {
            tracing::debug!(attempt, "poll: not ready, sleeping {:?}", policy.interval);
            sleeper.sleep(policy.interval);
        }
    }
    Ok(None)
}
