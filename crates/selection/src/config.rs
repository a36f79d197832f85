//! Retry configuration for state selection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempt budget and backoff parameters for one selection.
///
/// After failed attempt `n` (1-based) the engine waits
/// `min(base_delay * 2^n, cap / 2) * jitter` with jitter in `[1.0, 2.0)`.
/// No wait follows the final attempt.
///
/// In TOML, durations are given in milliseconds:
///
/// ```toml
/// max_attempts = 8
/// base_delay_ms = 100
/// cap_ms = 2000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of query-and-reserve attempts.
    pub max_attempts: u32,

    /// Base backoff delay.
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,

    /// Backoff cap. The exponential term never exceeds half of it.
    #[serde(rename = "cap_ms", with = "millis")]
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(100),
            cap: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base backoff delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the backoff cap.
    pub fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Delay before the attempt following failed attempt `attempt`.
    ///
    /// `jitter` is clamped into `[1.0, 2.0)`.
    pub fn backoff(&self, attempt: u32, jitter: f64) -> Duration {
        let jitter = jitter.clamp(1.0, 2.0 - f64::EPSILON);
        let nanos = self.unjittered(attempt).as_nanos() as f64 * jitter;
        Duration::from_nanos(nanos as u64)
    }

    /// Exclusive upper bound on total time spent sleeping across all attempts.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.unjittered(attempt).saturating_mul(2))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    fn unjittered(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.cap / 2)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.cap, Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_doubles_then_caps_at_half() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff(1, 1.0), Duration::from_millis(200));
        assert_eq!(policy.backoff(2, 1.0), Duration::from_millis(400));
        assert_eq!(policy.backoff(3, 1.0), Duration::from_millis(800));
        // 1600ms exceeds cap / 2
        assert_eq!(policy.backoff(4, 1.0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(40, 1.0), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_applies_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1, 1.5), Duration::from_millis(300));

        // Out-of-range jitter is clamped
        assert_eq!(policy.backoff(1, 0.1), Duration::from_millis(200));
        assert!(policy.backoff(1, 7.0) <= Duration::from_millis(400));
    }

    #[test]
    fn test_worst_case_wait() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        // Attempts 1 and 2 sleep for under 400ms and 800ms
        assert_eq!(policy.worst_case_wait(), Duration::from_millis(1200));
        assert_eq!(RetryPolicy::single_attempt().worst_case_wait(), Duration::ZERO);
    }

    #[test]
    fn test_toml_uses_millisecond_fields() {
        let policy: RetryPolicy = toml::from_str("max_attempts = 3\nbase_delay_ms = 5").unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(5));
        assert_eq!(policy.cap, Duration::from_millis(2000));
    }
}
