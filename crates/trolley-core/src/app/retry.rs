//! Retry policy: decides how many sends and how long to wait between them.

use std::time::Duration;

/// Retry policy for producer sends.
///
/// Linear backoff: after failed attempt `i` (1-indexed) wait `i * unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total send attempts, including the first one.
    pub max_attempts: u32,

    /// Backoff unit.
    pub unit: Duration,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit,
        }
    }

    /// Delay before the attempt that follows `attempt`.
    ///
    /// Example with unit=1s:
    /// - after attempt 1: 1s
    /// - after attempt 2: 2s
    /// - after attempt 3: 3s
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt.max(1))
    }

    /// Whether another attempt follows `attempt`.
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(1))
    }
}
