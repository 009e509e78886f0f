//! Batch processing: bounded-concurrency fan-out of one received batch,
//! fan-in of outcomes, and the acknowledge decision per message.

use std::pin::pin;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::codec::Codec;
use crate::config::ConsumerConfig;
use crate::dispatch::{Dispatcher, HandlerRegistry, PatternExtractor};
use crate::error::AckError;
use crate::message::{BatchSummary, DispatchOutcome, Message};
use crate::queue_client::QueueClient;

/// Outcome of one dispatch, sent back through the fan-in channel.
struct DispatchResult {
    message: Message,
    outcome: DispatchOutcome,
}

/// Processes one received batch under the configured concurrency bound.
///
/// Messages fan out to concurrent dispatch tasks gated by a semaphore (up
/// to `max_concurrency` handlers in flight at once, not one-at-a-time),
/// and their outcomes fan back in over a channel where the acknowledge
/// decision is applied:
///
/// - `Success` - acknowledged
/// - `HandlerNotFound` - acknowledged only under `discard_on_unroutable`
/// - `HandlerFailure` / `TimedOut` - left on the queue for redelivery
///
/// Errors are fully contained per message; one bad message never aborts
/// the batch, and `process` itself never fails.
pub struct BatchProcessor<Q, C, R, E> {
    queue: Arc<Q>,
    dispatcher: Arc<Dispatcher<C, R, E>>,
    config: Arc<ConsumerConfig>,
    semaphore: Arc<Semaphore>,
}

impl<Q, C, R, E> BatchProcessor<Q, C, R, E>
where
    Q: QueueClient + 'static,
    C: Codec + 'static,
    R: HandlerRegistry<C::Value> + 'static,
    E: PatternExtractor<C::Value> + 'static,
{
    pub fn new(
        queue: Arc<Q>,
        dispatcher: Arc<Dispatcher<C, R, E>>,
        config: Arc<ConsumerConfig>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            queue,
            dispatcher,
            config,
            semaphore,
        }
    }

    /// Dispatch every message in the batch and return the outcome counts.
    pub async fn process(&self, batch: Vec<Message>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        if batch.is_empty() {
            return summary;
        }

        let (result_tx, mut result_rx) = mpsc::channel::<DispatchResult>(batch.len());

        for message in batch {
            let queue = Arc::clone(&self.queue);
            let dispatcher = Arc::clone(&self.dispatcher);
            let config = Arc::clone(&self.config);
            let semaphore = Arc::clone(&self.semaphore);
            let result_tx = result_tx.clone();

            tokio::spawn(async move {
                // The permit bounds in-flight handlers; semaphore wait time
                // does not count against the per-message budget.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let outcome = dispatch_one(&*queue, &*dispatcher, &*config, &message).await;

                // Receiver only closes once all results are in, so a send
                // failure means the whole batch was dropped mid-flight.
                if result_tx.send(DispatchResult { message, outcome }).await.is_err() {
                    tracing::error!("batch result channel closed before completion");
                }
            });
        }
        drop(result_tx);

        while let Some(DispatchResult { message, outcome }) = result_rx.recv().await {
            self.settle(message, outcome, &mut summary).await;
        }

        summary
    }

    /// Apply the acknowledge policy for one completed dispatch and tally
    /// it into the summary.
    async fn settle(&self, message: Message, outcome: DispatchOutcome, summary: &mut BatchSummary) {
        let should_ack = match &outcome {
            DispatchOutcome::Success => true,
            DispatchOutcome::HandlerNotFound => {
                summary.not_found += 1;
                self.config.discard_on_unroutable
            }
            DispatchOutcome::HandlerFailure(reason) => {
                summary.failed += 1;
                tracing::warn!(
                    receipt_handle = %message.receipt_handle,
                    reason = %reason,
                    "message left unacknowledged after handler failure"
                );
                false
            }
            DispatchOutcome::TimedOut => {
                summary.timed_out += 1;
                tracing::warn!(
                    receipt_handle = %message.receipt_handle,
                    "message left unacknowledged after timeout"
                );
                false
            }
        };

        if !should_ack {
            return;
        }

        match self.queue.acknowledge(&message).await {
            Ok(()) => summary.acknowledged += 1,
            Err(AckError::AlreadyDeleted) => {
                tracing::debug!(
                    receipt_handle = %message.receipt_handle,
                    "message was already deleted, treating as acknowledged"
                );
                summary.acknowledged += 1;
            }
            Err(AckError::Transport(e)) => {
                // The message stays on the queue and will be redelivered.
                summary.failed += 1;
                tracing::error!(
                    receipt_handle = %message.receipt_handle,
                    error = %e,
                    "unable to acknowledge message"
                );
            }
        }
    }
}

/// Run one dispatch, optionally extending the message's visibility once
/// if the handler is still running at half the visibility timeout.
async fn dispatch_one<Q, C, R, E>(
    queue: &Q,
    dispatcher: &Dispatcher<C, R, E>,
    config: &ConsumerConfig,
    message: &Message,
) -> DispatchOutcome
where
    Q: QueueClient,
    C: Codec,
    R: HandlerRegistry<C::Value>,
    E: PatternExtractor<C::Value>,
{
    let dispatch = dispatcher.dispatch(message, config.per_message_timeout);

    if !config.extend_visibility_on_slow_handler {
        return dispatch.await;
    }

    let mut dispatch = pin!(dispatch);
    let extend_after = config.visibility_timeout / 2;

    tokio::select! {
        outcome = &mut dispatch => outcome,
        _ = tokio::time::sleep(extend_after) => {
            match queue.extend_visibility(message, config.visibility_timeout).await {
                Ok(()) => tracing::debug!(
                    receipt_handle = %message.receipt_handle,
                    "extended visibility for slow handler"
                ),
                // Best-effort: a failed extension just risks early redelivery.
                Err(e) => tracing::warn!(
                    receipt_handle = %message.receipt_handle,
                    error = %e,
                    "failed to extend visibility for slow handler"
                ),
            }
            dispatch.await
        }
    }
}
