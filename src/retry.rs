use std::time::Duration;

/// Exponential backoff bounded by a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(20);
        let multiplier = 1_u64 << shift;
        let calculated = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(calculated.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1_000, 8_000)
    }
}
