//! Delay between passes over the probe order.

use std::time::Duration;

/// Exponential backoff: `initial × multiplier^attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub multiplier: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            multiplier: 2,
        }
    }
}

impl Backoff {
    /// Delay after the failed pass `attempt` (0-indexed): 100ms, 200ms, 400ms, ...
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor)
    }
}
