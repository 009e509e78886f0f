//! Pattern-based dispatch: resolve a message to a registered handler and
//! normalize whatever happens into a [`DispatchOutcome`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::codec::Codec;
use crate::error::HandlerError;
use crate::message::{DispatchOutcome, Message};

/// Read-only metadata handed to a handler alongside the decoded payload.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    /// The pattern this message was routed by.
    pub pattern: &'a str,
    /// Queue metadata attributes of the message.
    pub attributes: &'a HashMap<String, String>,
    /// How many times the queue has delivered this message.
    pub receive_count: u32,
}

/// A registered message handler.
///
/// Implement this for each pattern your consumer serves. Handlers run
/// under the per-message timeout budget; errors they return (and anything
/// they fail to deserialize downstream) are contained per message and
/// never abort the batch.
///
/// ```rust
/// use async_trait::async_trait;
/// use drover::{Handler, HandlerError, MessageContext};
///
/// struct OrderCreated;
///
/// #[async_trait]
/// impl Handler<Vec<u8>> for OrderCreated {
///     async fn handle(
///         &self,
///         payload: &Vec<u8>,
///         ctx: &MessageContext<'_>,
///     ) -> Result<(), HandlerError> {
///         println!("{}: {} bytes (delivery #{})", ctx.pattern, payload.len(), ctx.receive_count);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<V>: Send + Sync {
    async fn handle(&self, payload: &V, ctx: &MessageContext<'_>) -> Result<(), HandlerError>;
}

/// Lookup from pattern name to handler.
///
/// This is a consumed interface: an RPC framework's registration table can
/// implement it directly. A plain `HashMap` works out of the box for
/// standalone use.
pub trait HandlerRegistry<V>: Send + Sync {
    fn resolve(&self, pattern: &str) -> Option<Arc<dyn Handler<V>>>;
}

impl<V> HandlerRegistry<V> for HashMap<String, Arc<dyn Handler<V>>> {
    fn resolve(&self, pattern: &str) -> Option<Arc<dyn Handler<V>>> {
        self.get(pattern).cloned()
    }
}

/// Extracts the routing pattern from a message.
///
/// The pattern may live in a queue attribute or inside the decoded body,
/// so extractors see both. Returning `None` marks the message unroutable.
pub trait PatternExtractor<V>: Send + Sync {
    fn pattern(&self, message: &Message, payload: &V) -> Option<String>;
}

/// Default extractor: reads the pattern from a message attribute
/// (`"pattern"` unless configured otherwise).
#[derive(Debug, Clone)]
pub struct AttributePattern {
    key: String,
}

impl AttributePattern {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for AttributePattern {
    fn default() -> Self {
        Self::new("pattern")
    }
}

impl<V> PatternExtractor<V> for AttributePattern {
    fn pattern(&self, message: &Message, _payload: &V) -> Option<String> {
        message.attributes.get(&self.key).cloned()
    }
}

/// Resolves each message to a handler and invokes it under the timeout
/// budget.
///
/// The dispatch pipeline is: decode the body through the codec, extract
/// the pattern, look the handler up, invoke it. Every failure mode along
/// the way maps to a [`DispatchOutcome`] variant; `dispatch` never returns
/// an error and never panics on handler misbehavior.
pub struct Dispatcher<C, R, E = AttributePattern> {
    codec: C,
    registry: R,
    extractor: E,
}

impl<C, R> Dispatcher<C, R>
where
    C: Codec,
{
    /// Create a dispatcher with the default attribute-based pattern
    /// extractor.
    pub fn new(codec: C, registry: R) -> Self {
        Self {
            codec,
            registry,
            extractor: AttributePattern::default(),
        }
    }
}

impl<C, R, E> Dispatcher<C, R, E>
where
    C: Codec,
    R: HandlerRegistry<C::Value>,
    E: PatternExtractor<C::Value>,
{
    /// Replace the pattern extractor (builder pattern).
    pub fn with_pattern_extractor<E2>(self, extractor: E2) -> Dispatcher<C, R, E2>
    where
        E2: PatternExtractor<C::Value>,
    {
        Dispatcher {
            codec: self.codec,
            registry: self.registry,
            extractor,
        }
    }

    /// Dispatch one message, bounding handler execution by `budget`.
    ///
    /// On timeout the handler's eventual result is discarded; there is no
    /// guarantee the handler truly stopped, but the message is treated as
    /// failed and left unacknowledged.
    pub async fn dispatch(&self, message: &Message, budget: Duration) -> DispatchOutcome {
        let payload = match self.codec.deserialize(&message.body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    receipt_handle = %message.receipt_handle,
                    error = %e,
                    "failed to decode message body"
                );
                return DispatchOutcome::HandlerFailure(e.to_string());
            }
        };

        let pattern = match self.extractor.pattern(message, &payload) {
            Some(pattern) => pattern,
            None => {
                tracing::warn!(
                    receipt_handle = %message.receipt_handle,
                    "message carries no routing pattern"
                );
                return DispatchOutcome::HandlerNotFound;
            }
        };

        let handler = match self.registry.resolve(&pattern) {
            Some(handler) => handler,
            None => {
                tracing::warn!(pattern = %pattern, "no handler registered for pattern");
                return DispatchOutcome::HandlerNotFound;
            }
        };

        let ctx = MessageContext {
            pattern: &pattern,
            attributes: &message.attributes,
            receive_count: message.receive_count,
        };

        match tokio::time::timeout(budget, handler.handle(&payload, &ctx)).await {
            Ok(Ok(())) => {
                tracing::trace!(pattern = %pattern, "message handled successfully");
                DispatchOutcome::Success
            }
            Ok(Err(e)) => {
                tracing::error!(pattern = %pattern, error = %e, "handler failed");
                DispatchOutcome::HandlerFailure(e.to_string())
            }
            Err(_) => {
                tracing::error!(
                    pattern = %pattern,
                    budget_ms = budget.as_millis() as u64,
                    "handler exceeded its timeout budget"
                );
                DispatchOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IdentityCodec;

    struct Ack;

    #[async_trait]
    impl Handler<Vec<u8>> for Ack {
        async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct Boom;

    #[async_trait]
    impl Handler<Vec<u8>> for Boom {
        async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
            Err("boom".into())
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Handler<Vec<u8>> for Sleepy {
        async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn registry(
        pairs: Vec<(&str, Arc<dyn Handler<Vec<u8>>>)>,
    ) -> HashMap<String, Arc<dyn Handler<Vec<u8>>>> {
        pairs
            .into_iter()
            .map(|(pattern, handler)| (pattern.to_string(), handler))
            .collect()
    }

    fn message(pattern: &str) -> Message {
        Message::new("rh-1", Vec::new()).with_attribute("pattern", pattern)
    }

    #[tokio::test]
    async fn routes_to_registered_handler() {
        let dispatcher = Dispatcher::new(IdentityCodec, registry(vec![("a", Arc::new(Ack))]));
        let outcome = dispatcher.dispatch(&message("a"), Duration::from_secs(1)).await;
        assert_eq!(outcome, DispatchOutcome::Success);
    }

    #[tokio::test]
    async fn unknown_pattern_is_not_found() {
        let dispatcher = Dispatcher::new(IdentityCodec, registry(vec![("a", Arc::new(Ack))]));
        let outcome = dispatcher.dispatch(&message("b"), Duration::from_secs(1)).await;
        assert_eq!(outcome, DispatchOutcome::HandlerNotFound);
    }

    #[tokio::test]
    async fn missing_pattern_attribute_is_not_found() {
        let dispatcher = Dispatcher::new(IdentityCodec, registry(vec![("a", Arc::new(Ack))]));
        let unrouted = Message::new("rh-2", Vec::new());
        let outcome = dispatcher.dispatch(&unrouted, Duration::from_secs(1)).await;
        assert_eq!(outcome, DispatchOutcome::HandlerNotFound);
    }

    #[tokio::test]
    async fn handler_error_becomes_failure() {
        let dispatcher = Dispatcher::new(IdentityCodec, registry(vec![("a", Arc::new(Boom))]));
        let outcome = dispatcher.dispatch(&message("a"), Duration::from_secs(1)).await;
        assert_eq!(outcome, DispatchOutcome::HandlerFailure("boom".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out() {
        let dispatcher = Dispatcher::new(IdentityCodec, registry(vec![("a", Arc::new(Sleepy))]));
        let outcome = dispatcher.dispatch(&message("a"), Duration::from_millis(50)).await;
        assert_eq!(outcome, DispatchOutcome::TimedOut);
    }

    #[tokio::test]
    async fn custom_extractor_reads_body() {
        struct BodyPattern;
        impl PatternExtractor<Vec<u8>> for BodyPattern {
            fn pattern(&self, _message: &Message, payload: &Vec<u8>) -> Option<String> {
                String::from_utf8(payload.clone()).ok()
            }
        }

        let dispatcher = Dispatcher::new(IdentityCodec, registry(vec![("a", Arc::new(Ack))]))
            .with_pattern_extractor(BodyPattern);
        let by_body = Message::new("rh-3", b"a".to_vec());
        let outcome = dispatcher.dispatch(&by_body, Duration::from_secs(1)).await;
        assert_eq!(outcome, DispatchOutcome::Success);
    }
}
