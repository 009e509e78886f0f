//! The long-running receive/process driver behind a consumer.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;

use crate::backoff::ExponentialBackoff;
use crate::batch::BatchProcessor;
use crate::codec::Codec;
use crate::config::ConsumerConfig;
use crate::dispatch::{HandlerRegistry, PatternExtractor};
use crate::queue_client::QueueClient;

/// Repeatedly receives a batch and hands it to the batch processor.
///
/// Transport errors on receive back off exponentially and never terminate
/// the loop; the backoff resets on the first successful receive. Stop is
/// cooperative: the shutdown signal prevents the next batch from starting,
/// while an in-flight batch always runs to completion.
pub(crate) struct PollLoop<Q, C, R, E> {
    queue: Arc<Q>,
    processor: BatchProcessor<Q, C, R, E>,
    config: Arc<ConsumerConfig>,
    shutdown: watch::Receiver<bool>,
}

impl<Q, C, R, E> PollLoop<Q, C, R, E>
where
    Q: QueueClient + 'static,
    C: Codec + 'static,
    R: HandlerRegistry<C::Value> + 'static,
    E: PatternExtractor<C::Value> + 'static,
{
    pub(crate) fn new(
        queue: Arc<Q>,
        processor: BatchProcessor<Q, C, R, E>,
        config: Arc<ConsumerConfig>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            processor,
            config,
            shutdown,
        }
    }

    #[tracing::instrument(skip_all)]
    pub(crate) async fn run(mut self) {
        tracing::info!(
            batch_size = self.config.batch_size,
            max_concurrency = self.config.max_concurrency,
            "poll loop started"
        );

        let mut backoff = ExponentialBackoff::new(self.config.backoff.clone());
        let mut last_heartbeat = Instant::now();

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            if last_heartbeat.elapsed() >= self.config.heartbeat_interval {
                tracing::info!("poll loop heartbeat - still running");
                last_heartbeat = Instant::now();
            }

            // Racing the receive against shutdown lets stop() interrupt a
            // long poll; any messages a dropped receive did fetch simply
            // become visible again after their visibility timeout.
            let received = tokio::select! {
                _ = self.shutdown.changed() => break,
                received = self.queue.receive_batch(
                    self.config.batch_size,
                    self.config.poll_wait_time,
                ) => received,
            };

            match received {
                Ok(batch) if batch.is_empty() => {
                    backoff.reset();
                    if let Some(idle) = self.config.idle_interval {
                        tokio::select! {
                            _ = self.shutdown.changed() => break,
                            _ = tokio::time::sleep(idle) => {}
                        }
                    }
                }
                Ok(batch) => {
                    backoff.reset();
                    let received_count = batch.len();
                    let summary = self.processor.process(batch).await;
                    tracing::debug!(
                        received = received_count,
                        acknowledged = summary.acknowledged,
                        failed = summary.failed,
                        not_found = summary.not_found,
                        timed_out = summary.timed_out,
                        "batch processed"
                    );
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        consecutive_failures = backoff.failures(),
                        delay_ms = delay.as_millis() as u64,
                        "transport error receiving batch, backing off"
                    );
                    tokio::select! {
                        _ = self.shutdown.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!("poll loop stopped");
    }
}
