//! Retry policies for transient fetch failures

use std::time::Duration;

use super::types::DEFAULT_RETRY_DELAY_MS;

/// Decides whether and when a failed page fetch is retried
pub trait RetryPolicy {
    /// Delay before retry number `attempt` (1 = first failure), or `None` to give up
    fn delay_for(&self, attempt: u32) -> Option<Duration>;
}

/// Retry forever with a fixed pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    pub delay: Duration,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
    }
}

impl RetryPolicy for FixedInterval {
    fn delay_for(&self, _attempt: u32) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Fixed pause, but stop after `max_attempts` failures on the same page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limited {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Limited {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl RetryPolicy for Limited {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then_some(self.delay)
    }
}

/// Build the policy for an optional retry cap
pub fn policy_for(delay: Duration, max_retries: Option<u32>) -> Box<dyn RetryPolicy + Send + Sync> {
    match max_retries {
        Some(max) => Box::new(Limited::new(delay, max.saturating_add(1))),
        None => Box::new(FixedInterval::new(delay)),
    }
}
