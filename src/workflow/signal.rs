//! Timing strategies for the processing monitor.
//!
//! The backend offers no completion event, so the monitor asks a
//! [`CompletionSignal`] when to look again.

use std::time::Duration;

use async_trait::async_trait;

use crate::retry::RetryPolicy;

#[async_trait]
pub trait CompletionSignal: Send + Sync {
    /// Pause after the processing notice goes up.
    async fn settle(&self);

    /// Wait before reconciliation attempt `attempt` (zero-based).
    /// Returns `false` once no further attempt should be made.
    async fn before_attempt(&self, attempt: u32) -> bool;
}

/// One delayed reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelayPoll {
    pub settle_delay: Duration,
    pub attempt_delay: Duration,
}

impl FixedDelayPoll {
    pub fn new(settle_delay: Duration, attempt_delay: Duration) -> Self {
        Self {
            settle_delay,
            attempt_delay,
        }
    }

    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl Default for FixedDelayPoll {
    /// 1s settle plus 4s wait: the first look happens ~5s after dispatch.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(4))
    }
}

#[async_trait]
impl CompletionSignal for FixedDelayPoll {
    async fn settle(&self) {
        sleep(self.settle_delay).await;
    }

    async fn before_attempt(&self, attempt: u32) -> bool {
        if attempt > 0 {
            return false;
        }
        sleep(self.attempt_delay).await;
        true
    }
}

/// Repeated attempts spaced by exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPoll {
    pub settle_delay: Duration,
    pub policy: RetryPolicy,
    pub max_attempts: u32,
}

impl BackoffPoll {
    pub fn new(settle_delay: Duration, policy: RetryPolicy, max_attempts: u32) -> Self {
        Self {
            settle_delay,
            policy,
            max_attempts,
        }
    }
}

#[async_trait]
impl CompletionSignal for BackoffPoll {
    async fn settle(&self) {
        sleep(self.settle_delay).await;
    }

    async fn before_attempt(&self, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        sleep(self.policy.delay_for_attempt(attempt)).await;
        true
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
