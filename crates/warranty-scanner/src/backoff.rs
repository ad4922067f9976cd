//! Jittered exponential backoff.

use rand::Rng;
use std::time::Duration;
use warranty_core::{RetryConfig, MAX_JITTER_FACTOR};

/// Computes and waits out randomized, exponentially growing retry delays.
///
/// The pre-jitter base for attempt `n` is `min(cap, 2^n)` seconds; the
/// delay is the base times a factor drawn uniformly from
/// `[jitter_min, jitter_max]`.
#[derive(Debug, Clone)]
pub struct BackoffScheduler {
    cap_secs: u64,
    jitter_min: f64,
    jitter_max: f64,
    escalate: bool,
}

impl BackoffScheduler {
    /// Create a scheduler with an explicit cap and jitter range.
    ///
    /// Jitter bounds are clamped to `[0, MAX_JITTER_FACTOR]`, a NaN bound
    /// becomes 1.0 and reversed bounds are swapped.
    #[must_use]
    pub fn new(cap_secs: u64, jitter_min: f64, jitter_max: f64) -> Self {
        let mut jitter_min = clamp_factor(jitter_min);
        let mut jitter_max = clamp_factor(jitter_max);
        if jitter_min > jitter_max {
            std::mem::swap(&mut jitter_min, &mut jitter_max);
        }
        Self {
            cap_secs,
            jitter_min,
            jitter_max,
            escalate: true,
        }
    }

    /// Create a scheduler from retry settings.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.backoff_cap_secs, config.jitter_min, config.jitter_max)
            .with_escalation(config.escalate)
    }

    /// When disabled, [`delay`](Self::delay) treats every call as attempt 1.
    #[must_use]
    pub fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate = escalate;
        self
    }

    /// Pre-jitter delay for `attempt` (attempt 0 is treated as 1).
    #[must_use]
    pub fn base_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1);
        let secs = 2u64
            .checked_pow(exponent)
            .unwrap_or(u64::MAX)
            .min(self.cap_secs);
        Duration::from_secs(secs)
    }

    /// Jittered delay for `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(self.jitter_min..=self.jitter_max);
        Duration::try_from_secs_f64(self.base_for(attempt).as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Wait before retry number `attempt` and return how long was waited.
    pub async fn delay(&self, attempt: u32) -> Duration {
        let attempt = if self.escalate { attempt } else { 1 };
        let delay = self.delay_for(attempt);
        tracing::debug!("Backing off for {:?} (attempt {})", delay, attempt);
        tokio::time::sleep(delay).await;
        delay
    }
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        1.0
    } else {
        factor.clamp(0.0, MAX_JITTER_FACTOR)
    }
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_grows_then_caps() {
        let backoff = BackoffScheduler::default();
        assert_eq!(backoff.base_for(1), Duration::from_secs(2));
        assert_eq!(backoff.base_for(2), Duration::from_secs(4));
        assert_eq!(backoff.base_for(5), Duration::from_secs(32));
        assert_eq!(backoff.base_for(6), Duration::from_secs(60));
        assert_eq!(backoff.base_for(40), Duration::from_secs(60));
        assert_eq!(backoff.base_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_attempt_zero_is_attempt_one() {
        let backoff = BackoffScheduler::default();
        assert_eq!(backoff.base_for(0), backoff.base_for(1));
    }

    #[test]
    fn test_first_attempt_jitter_bounds() {
        let backoff = BackoffScheduler::default();
        for _ in 0..200 {
            let delay = backoff.delay_for(1);
            assert!(delay >= Duration::from_secs(1), "{delay:?} below bound");
            assert!(delay <= Duration::from_secs(3), "{delay:?} above bound");
        }
    }

    #[test]
    fn test_capped_attempt_jitter_bounds() {
        let backoff = BackoffScheduler::default();
        for _ in 0..200 {
            let delay = backoff.delay_for(6);
            assert!(delay >= Duration::from_secs(30));
            assert!(delay <= Duration::from_secs(90));
        }
    }

    #[test]
    fn test_zero_width_jitter_is_exact() {
        let backoff = BackoffScheduler::new(60, 1.0, 1.0);
        assert_eq!(backoff.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_unbounded_jitter_is_clamped() {
        let backoff = BackoffScheduler::new(60, 0.5, f64::INFINITY);
        for _ in 0..50 {
            let delay = backoff.delay_for(1);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(20));
        }

        let backoff = BackoffScheduler::new(60, f64::NAN, f64::NEG_INFINITY);
        assert!(backoff.delay_for(2) <= Duration::from_secs(4));
    }

    #[test]
    fn test_reversed_jitter_is_swapped() {
        let backoff = BackoffScheduler::new(60, 1.5, 0.5);
        for _ in 0..50 {
            let delay = backoff.delay_for(1);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(3));
        }
    }

    #[test]
    fn test_huge_cap_saturates() {
        let backoff = BackoffScheduler::new(u64::MAX, MAX_JITTER_FACTOR, MAX_JITTER_FACTOR);
        assert_eq!(backoff.delay_for(u32::MAX), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_sleeps() {
        let backoff = BackoffScheduler::new(60, 1.0, 1.0);
        let start = tokio::time::Instant::now();
        let waited = backoff.delay(2).await;
        assert_eq!(waited, Duration::from_secs(4));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_escalating_always_uses_first_attempt() {
        let backoff = BackoffScheduler::new(60, 1.0, 1.0).with_escalation(false);
        assert_eq!(backoff.delay(5).await, Duration::from_secs(2));
    }
}
