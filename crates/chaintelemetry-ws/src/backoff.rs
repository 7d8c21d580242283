//! Capped exponential reconnect backoff.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Stateless backoff policy; computes the delay for a given attempt number.
#[derive(Debug, Clone, Default)]
pub struct ReconnectPolicy {
    pub config: BackoffConfig,
}

impl ReconnectPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before reconnect attempt `attempt` (1-based):
    /// `min(base * 2^attempt, cap)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self
            .config
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.config.max_delay_ms);
        Duration::from_millis(millis)
    }
}
