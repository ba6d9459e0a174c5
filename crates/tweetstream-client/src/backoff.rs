//! Exponential reconnect backoff

use std::time::Duration;

use crate::config::BackoffConfig;

/// Stateless backoff policy, computes the delay for a given retry number
///
/// The curve is `base * multiplier^(retry - 1)` capped at `max_delay`. It
/// never decreases as `retry` grows.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    config: BackoffConfig,
}

impl BackoffPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Maximum number of consecutive retries
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Returns `true` while another retry is allowed after `retries` consecutive ones
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.config.max_retries
    }

    /// Delay before the `retry`-th consecutive reconnect (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        if self.config.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let base_ms = self.config.base_delay_ms as f64;
        let cap_ms = self.config.max_delay_ms.max(self.config.base_delay_ms) as f64;
        let multiplier = self.config.multiplier.max(1.0);
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;

        let delay_ms = (base_ms * multiplier.powi(exponent)).min(cap_ms);
        Duration::from_millis(delay_ms as u64)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base: u64, multiplier: f64, max: u64, retries: u32) -> BackoffPolicy {
        BackoffPolicy::new(BackoffConfig {
            base_delay_ms: base,
            multiplier,
            max_delay_ms: max,
            max_retries: retries,
        })
    }

    #[test]
    fn test_exponential_growth() {
        let p = policy(100, 2.0, 30_000, 5);
        assert_eq!(p.delay(1), Duration::from_millis(100));
        assert_eq!(p.delay(2), Duration::from_millis(200));
        assert_eq!(p.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_capped_at_max() {
        let p = policy(100, 10.0, 500, 10);
        assert_eq!(p.delay(5), Duration::from_millis(500));
        assert_eq!(p.delay(1_000), Duration::from_millis(500));
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        for p in [
            policy(250, 2.0, 240_000, 320),
            policy(10, 1.5, 1_000, 50),
            policy(5, 0.5, 100, 50),
            policy(0, 2.0, 0, 5),
        ] {
            let mut previous = Duration::ZERO;
            for retry in 1..=200 {
                let d = p.delay(retry);
                assert!(d >= previous, "retry {} went from {:?} to {:?}", retry, previous, d);
                previous = d;
            }
        }
    }

    #[test]
    fn test_retry_budget() {
        let p = policy(1, 2.0, 10, 2);
        assert!(p.should_retry(0));
        assert!(p.should_retry(1));
        assert!(!p.should_retry(2));

        let none = policy(1, 2.0, 10, 0);
        assert!(!none.should_retry(0));
    }

    #[test]
    fn test_immediate_policy_has_no_delay() {
        let p = BackoffPolicy::new(BackoffConfig::immediate(3));
        assert_eq!(p.delay(1), Duration::ZERO);
        assert_eq!(p.delay(3), Duration::ZERO);
    }
}
