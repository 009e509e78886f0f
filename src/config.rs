//! Consumer configuration.

use std::time::Duration;

use crate::backoff::BackoffConfig;

/// Immutable configuration for a consumer, captured at construction.
///
/// Use the defaults and override what you need with the `with_*` builder
/// methods:
///
/// ```rust
/// use std::time::Duration;
/// use drover::ConsumerConfig;
///
/// let config = ConsumerConfig::default()
///     .with_batch_size(5)
///     .with_max_concurrency(32)
///     .with_per_message_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum messages requested per receive call. Queue vendors apply
    /// their own ceiling (SQS caps at 10).
    pub batch_size: u32,
    /// Maximum messages dispatched concurrently within a batch.
    pub max_concurrency: usize,
    /// Long-poll duration passed to the queue client; zero means
    /// immediate return.
    pub poll_wait_time: Duration,
    /// Extra sleep after an empty batch. None (the default) re-polls
    /// immediately, relying on the long-poll wait for pacing.
    pub idle_interval: Option<Duration>,
    /// Queue-side visibility timeout the consumer assumes when deciding
    /// whether to extend a slow handler's message.
    pub visibility_timeout: Duration,
    /// Budget for a single handler invocation.
    pub per_message_timeout: Duration,
    /// Acknowledge messages that no handler matches, dropping them
    /// instead of letting them cycle through redelivery.
    pub discard_on_unroutable: bool,
    /// Extend a message's visibility once if its handler is still running
    /// near the visibility timeout boundary.
    pub extend_visibility_on_slow_handler: bool,
    /// How often the poll loop logs a liveness heartbeat.
    pub heartbeat_interval: Duration,
    /// Retry delays for transport errors on receive.
    pub backoff: BackoffConfig,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrency: 16,
            poll_wait_time: Duration::from_secs(20),
            idle_interval: None,
            visibility_timeout: Duration::from_secs(30),
            per_message_timeout: Duration::from_secs(300),
            discard_on_unroutable: false,
            extend_visibility_on_slow_handler: false,
            heartbeat_interval: Duration::from_secs(60),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ConsumerConfig {
    /// Set the receive batch size (builder pattern). Clamped to at least 1.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the concurrent dispatch limit (builder pattern). Clamped to at
    /// least 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Set the long-poll wait passed to receive calls (builder pattern).
    pub fn with_poll_wait_time(mut self, wait: Duration) -> Self {
        self.poll_wait_time = wait;
        self
    }

    /// Sleep this long after an empty batch instead of re-polling
    /// immediately (builder pattern).
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = Some(interval);
        self
    }

    /// Set the assumed queue-side visibility timeout (builder pattern).
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Set the per-handler-invocation budget (builder pattern).
    pub fn with_per_message_timeout(mut self, timeout: Duration) -> Self {
        self.per_message_timeout = timeout;
        self
    }

    /// Acknowledge unroutable messages instead of leaving them for
    /// redelivery (builder pattern).
    pub fn with_discard_on_unroutable(mut self, discard: bool) -> Self {
        self.discard_on_unroutable = discard;
        self
    }

    /// Extend visibility once for handlers still running near the
    /// visibility boundary (builder pattern).
    pub fn with_extend_visibility_on_slow_handler(mut self, extend: bool) -> Self {
        self.extend_visibility_on_slow_handler = extend;
        self
    }

    /// Set the heartbeat logging interval (builder pattern).
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the transport-error backoff parameters (builder pattern).
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_zero_values() {
        let config = ConsumerConfig::default()
            .with_batch_size(0)
            .with_max_concurrency(0);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn idle_interval_defaults_to_immediate_repoll() {
        assert!(ConsumerConfig::default().idle_interval.is_none());
    }
}
