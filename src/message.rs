//! Message values and per-message/per-batch outcomes.

use std::collections::HashMap;

/// An immutable message received from the queue.
///
/// This struct decouples the message content from any particular queue
/// vendor: the receipt handle is an opaque token the queue client needs to
/// delete the message or extend its visibility, the body is the raw wire
/// payload, and the attributes carry queue metadata as string pairs (the
/// default pattern extractor reads the routing pattern from them).
///
/// The batch processor owns a message for the duration of its processing
/// and hands it to the dispatcher by reference; it is never mutated after
/// receipt.
#[derive(Debug, Clone)]
pub struct Message {
    /// Opaque token required to acknowledge or extend this message.
    pub receipt_handle: String,
    /// Raw payload bytes, decoded through the configured codec.
    pub body: Vec<u8>,
    /// Queue metadata, e.g. message attributes on SQS.
    pub attributes: HashMap<String, String>,
    /// How many times the queue has delivered this message, when known.
    pub receive_count: u32,
}

impl Message {
    pub fn new(receipt_handle: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            receipt_handle: receipt_handle.into(),
            body: body.into(),
            attributes: HashMap::new(),
            receive_count: 1,
        }
    }

    /// Attach a metadata attribute (builder pattern).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the approximate receive count (builder pattern).
    pub fn with_receive_count(mut self, count: u32) -> Self {
        self.receive_count = count;
        self
    }
}

/// The result of dispatching one message.
///
/// Produced by the dispatcher, consumed by the batch processor to decide
/// whether the message is acknowledged. Only `Success` (and
/// `HandlerNotFound` under the discard-on-unroutable policy) leads to an
/// acknowledge call; every other outcome leaves the message on the queue
/// to become visible again once its visibility timeout expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler completed without error.
    Success,
    /// The handler returned an error, or the body failed to deserialize.
    HandlerFailure(String),
    /// No handler is registered for the message's pattern, or no pattern
    /// could be extracted from the message at all.
    HandlerNotFound,
    /// The handler exceeded the per-message timeout budget. Its result is
    /// discarded; there is no guarantee it actually stopped running.
    TimedOut,
}

/// Per-batch outcome counts, returned by the batch processor.
///
/// `acknowledged` counts messages actually deleted from the queue, which
/// includes unroutable messages discarded under the discard-on-unroutable
/// policy (those are also counted under `not_found`). A success whose
/// acknowledge call fails at the transport level is counted under `failed`
/// instead, since the message stays on the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub acknowledged: usize,
    pub failed: usize,
    pub not_found: usize,
    pub timed_out: usize,
}

impl BatchSummary {
    /// Whether the batch completed with no failures, timeouts, or
    /// unroutable messages.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.timed_out == 0 && self.not_found == 0
    }
}
