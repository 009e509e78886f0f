//! Bounded exponential backoff with jitter for transport-error retries.

use std::time::Duration;

/// Retry delay configuration for the poll loop.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first consecutive failure.
    pub base_delay: Duration,
    /// Ceiling the delay never exceeds.
    pub max_delay: Duration,
    /// Multiplicative jitter in `0.0..=1.0`: each delay is scaled by a
    /// random factor in `1.0..=1.0 + jitter_fraction`, then capped.
    pub jitter_fraction: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.1,
        }
    }
}

// Doubling stops growing past this many failures; the cap takes over long
// before then for any sane configuration.
const MAX_EXPONENT: u32 = 32;

/// Tracks consecutive failures and produces the next retry delay.
///
/// Delays are non-decreasing across consecutive failures up to
/// `max_delay` (jitter only ever lengthens a delay, and doubling outpaces
/// the jitter ceiling), and [`reset`](Self::reset) drops back to the base
/// delay after a success.
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    consecutive_failures: u32,
}

impl ExponentialBackoff {
    pub fn new(mut config: BackoffConfig) -> Self {
        config.jitter_fraction = config.jitter_fraction.clamp(0.0, 1.0);
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next
    /// attempt.
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.consecutive_failures.min(MAX_EXPONENT);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        let delay = self.config.base_delay.mul_f64(2f64.powi(exponent as i32));
        let jittered = if self.config.jitter_fraction > 0.0 {
            delay.mul_f64(1.0 + fastrand::f64() * self.config.jitter_fraction)
        } else {
            delay
        };

        jittered.min(self.config.max_delay)
    }

    /// Clear the failure streak after a successful receive.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Current consecutive-failure count.
    pub fn failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jitter: f64) -> BackoffConfig {
        BackoffConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter_fraction: jitter,
        }
    }

    #[test]
    fn doubles_without_jitter() {
        let mut backoff = ExponentialBackoff::new(config(0.0));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn caps_at_max_delay() {
        let mut backoff = ExponentialBackoff::new(config(0.0));
        for _ in 0..20 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn reset_returns_to_base() {
        let mut backoff = ExponentialBackoff::new(config(0.0));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn jittered_delays_are_non_decreasing() {
        let mut backoff = ExponentialBackoff::new(config(0.5));
        let mut previous = Duration::ZERO;
        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay >= previous, "{delay:?} < {previous:?}");
            previous = delay;
        }
        assert_eq!(previous, Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut backoff = ExponentialBackoff::new(config(0.25));
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(125));
    }
}
