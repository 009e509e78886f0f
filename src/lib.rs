//! # Drover
//!
//! A queue-agnostic consumer core for Rust: pull message batches from a
//! remote queue, dispatch them to pattern-registered handlers with bounded
//! concurrency, and delete each message only when its handler succeeds.
//!
//! ## Features
//!
//! - **Generic Design**: Works with any queue system by implementing the
//!   [`QueueClient`] trait (SQS, RabbitMQ, in-memory fakes for tests)
//! - **Pattern Dispatch**: Messages route to handlers by a pattern name
//!   looked up in a [`HandlerRegistry`], with an explicit not-found path
//! - **Semaphore-Based Concurrency**: Up to `max_concurrency` handlers in
//!   flight per batch, never one-at-a-time serial awaiting
//! - **Acknowledge on Success**: Failed and timed-out messages are left on
//!   the queue to reappear after their visibility timeout; nothing is lost
//! - **Bounded Backoff**: Transport errors on receive retry with jittered
//!   exponential backoff and never kill the loop
//! - **Cooperative Lifecycle**: `start`/`stop`/`status` with guarded state
//!   transitions; stop lets the in-flight batch finish
//! - **Structured Logging**: `tracing` throughout, including poll-loop
//!   heartbeats and per-batch outcome summaries
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use drover::{
//!     AckError, ConsumerConfig, ConsumerController, Dispatcher, Handler, HandlerError,
//!     IdentityCodec, Message, MessageContext, QueueClient, TransportError,
//! };
//!
//! // 1. Implement QueueClient for your queue system
//! struct MyQueue;
//!
//! impl QueueClient for MyQueue {
//!     async fn receive_batch(
//!         &self,
//!         max_messages: u32,
//!         wait_time: Duration,
//!     ) -> Result<Vec<Message>, TransportError> {
//!         // Your queue receiving logic here
//!         Ok(vec![])
//!     }
//!
//!     async fn acknowledge(&self, message: &Message) -> Result<(), AckError> {
//!         // Your message deletion logic here
//!         Ok(())
//!     }
//! }
//!
//! // 2. Implement a Handler per message pattern
//! struct OrderCreated;
//!
//! #[async_trait]
//! impl Handler<Vec<u8>> for OrderCreated {
//!     async fn handle(
//!         &self,
//!         payload: &Vec<u8>,
//!         _ctx: &MessageContext<'_>,
//!     ) -> Result<(), HandlerError> {
//!         println!("order payload: {} bytes", payload.len());
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! // 3. Register handlers and build the consumer
//! let mut handlers: HashMap<String, Arc<dyn Handler<Vec<u8>>>> = HashMap::new();
//! handlers.insert("order.created".to_string(), Arc::new(OrderCreated));
//!
//! let dispatcher = Dispatcher::new(IdentityCodec, handlers);
//! let config = ConsumerConfig::default()
//!     .with_max_concurrency(8)
//!     .with_per_message_timeout(Duration::from_secs(30));
//! let consumer = ConsumerController::new(MyQueue, dispatcher, config);
//!
//! // 4. Start consuming; stop() drains the in-flight batch
//! consumer.start(|| tracing::info!("consumer ready")).await;
//! // ... run until a shutdown signal ...
//! consumer.stop().await;
//! # }
//! ```
//!
//! ## Architecture
//!
//! One poll loop per consumer drives a receive -> dispatch -> acknowledge
//! cycle:
//!
//! 1. The loop receives a batch through [`QueueClient::receive_batch`]
//! 2. The batch processor fans messages out to dispatch tasks, gated by a
//!    semaphore sized to `max_concurrency`
//! 3. Each dispatch decodes the body through the [`Codec`], extracts the
//!    routing pattern, resolves the handler, and runs it under the
//!    per-message timeout
//! 4. Outcomes fan back in; successes (and, optionally, unroutable
//!    messages) are acknowledged, everything else stays on the queue
//! 5. The loop repeats until [`ConsumerController::stop`] is called
//!
//! Delivery is at-least-once: handlers should be idempotent, since a
//! failed acknowledge or a crash mid-batch means redelivery.

mod backoff;
mod batch;
mod codec;
mod config;
mod consumer;
mod dispatch;
mod error;
mod message;
mod poll_loop;
mod queue_client;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use batch::BatchProcessor;
pub use codec::{Codec, IdentityCodec, JsonCodec};
pub use config::ConsumerConfig;
pub use consumer::{ConsumerController, ConsumerState};
pub use dispatch::{
    AttributePattern, Dispatcher, Handler, HandlerRegistry, MessageContext, PatternExtractor,
};
pub use error::{AckError, CodecError, HandlerError, TransportError};
pub use message::{BatchSummary, DispatchOutcome, Message};
pub use queue_client::QueueClient;
