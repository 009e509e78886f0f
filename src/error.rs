//! Error types for the consumer core.
//!
//! Per-message failures never surface as errors: the batch processor folds
//! them into [`DispatchOutcome`](crate::DispatchOutcome) values and counts
//! them in the batch summary. The types here cover the remaining surfaces:
//! queue transport, acknowledgment, and payload encoding. Queue client
//! implementations should map their vendor SDK errors into these at the
//! trait boundary rather than leaking SDK types through it.

use thiserror::Error;

/// Errors returned by handler implementations.
///
/// Boxed for flexibility - handlers can return any error type that
/// implements the standard `Error` trait. The dispatcher converts these
/// into `DispatchOutcome::HandlerFailure`; they are never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A queue communication failure: network, auth, throttling.
///
/// Transport errors from `receive_batch` are retried with backoff by the
/// poll loop and are never fatal to the consumer.
#[derive(Debug, Clone, Error)]
#[error("queue transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap a lower-level error, preserving its display text.
    pub fn from_source(source: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: source.to_string(),
        }
    }
}

/// Failure to acknowledge (delete) a message.
///
/// Not every queue guarantees idempotent deletes, so a repeated
/// acknowledgment may come back as [`AckError::AlreadyDeleted`]. The
/// batch processor treats that case as a successful acknowledgment.
#[derive(Debug, Error)]
pub enum AckError {
    /// The message was already deleted, typically by a retried
    /// acknowledge call. Harmless.
    #[error("message already deleted")]
    AlreadyDeleted,

    /// The acknowledge call itself failed at the transport level. The
    /// message stays on the queue and will be redelivered.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Payload encoding failure from a [`Codec`](crate::Codec).
///
/// A deserialization failure means the message body did not match the
/// declared schema; the dispatcher converts it into a handler failure so
/// the message is left unacknowledged for redelivery or dead-lettering.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("malformed message body: {0}")]
    Deserialize(String),

    #[error("payload serialization failed: {0}")]
    Serialize(String),
}
