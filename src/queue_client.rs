//! The consumed queue interface.
//!
//! The consumer core never talks to a queue vendor directly; everything it
//! needs from the queue goes through [`QueueClient`]. Implement this trait
//! to plug in SQS, RabbitMQ, an in-memory queue for tests, or anything
//! else with receive/delete/visibility semantics.

use std::sync::Arc;
use std::time::Duration;

use futures::Future;

use crate::error::{AckError, TransportError};
use crate::message::Message;

/// Capability contract required of the queue collaborator.
///
/// One client instance is shared across all dispatches within a consumer,
/// so implementations must tolerate concurrent `acknowledge` and
/// `extend_visibility` calls (vendor SDK clients generally do).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use drover::{AckError, Message, QueueClient, TransportError};
///
/// struct InMemoryQueue;
///
/// impl QueueClient for InMemoryQueue {
///     async fn receive_batch(
///         &self,
///         _max_messages: u32,
///         _wait_time: Duration,
///     ) -> Result<Vec<Message>, TransportError> {
///         Ok(vec![Message::new("receipt-1", b"payload".to_vec())])
///     }
///
///     async fn acknowledge(&self, message: &Message) -> Result<(), AckError> {
///         println!("deleting {}", message.receipt_handle);
///         Ok(())
///     }
/// }
/// ```
pub trait QueueClient: Send + Sync {
    /// Receive up to `max_messages` messages, waiting at most `wait_time`
    /// for one to arrive.
    ///
    /// Whether the call long-polls for the full `wait_time` or returns
    /// immediately when the queue is empty is up to the implementation;
    /// an empty vector is a normal result either way. Network and auth
    /// failures map to [`TransportError`], which the poll loop retries
    /// with backoff.
    fn receive_batch(
        &self,
        max_messages: u32,
        wait_time: Duration,
    ) -> impl Future<Output = Result<Vec<Message>, TransportError>> + Send;

    /// Delete a message from the queue after successful processing.
    ///
    /// If the queue reports the message as already deleted (e.g. a retried
    /// acknowledge), return [`AckError::AlreadyDeleted`] rather than a
    /// transport error; the core treats it as an acknowledged message.
    fn acknowledge(&self, message: &Message) -> impl Future<Output = Result<(), AckError>> + Send;

    /// Extend the message's visibility timeout while a slow handler is
    /// still working on it.
    ///
    /// Optional capability; the default implementation reports it as
    /// unsupported. Extension is best-effort - the batch processor logs a
    /// failure and carries on.
    fn extend_visibility(
        &self,
        message: &Message,
        duration: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let _ = (message, duration);
        async {
            Err(TransportError::new(
                "extend_visibility is not supported by this queue client",
            ))
        }
    }
}

/// Shared clients work anywhere an owned one does.
impl<T> QueueClient for Arc<T>
where
    T: QueueClient,
{
    fn receive_batch(
        &self,
        max_messages: u32,
        wait_time: Duration,
    ) -> impl Future<Output = Result<Vec<Message>, TransportError>> + Send {
        (**self).receive_batch(max_messages, wait_time)
    }

    fn acknowledge(&self, message: &Message) -> impl Future<Output = Result<(), AckError>> + Send {
        (**self).acknowledge(message)
    }

    fn extend_visibility(
        &self,
        message: &Message,
        duration: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).extend_visibility(message, duration)
    }
}
