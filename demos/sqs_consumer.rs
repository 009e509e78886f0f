//! AWS SQS binding: implements `QueueClient` over `aws-sdk-sqs` and runs
//! a consumer until ctrl-c.
//!
//! Set `SQS_QUEUE_URL`; credentials come from the usual AWS sources.
//! Route messages by giving them a `pattern` message attribute (the demo
//! registers a handler for `"echo"`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use tracing_subscriber::EnvFilter;

use drover::{
    AckError, ConsumerConfig, ConsumerController, Dispatcher, Handler, HandlerError,
    IdentityCodec, Message, MessageContext, QueueClient, TransportError,
};

#[derive(Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    fn convert(message: aws_sdk_sqs::types::Message) -> Option<Message> {
        let receipt_handle = message.receipt_handle?;
        let body = message.body.unwrap_or_default().into_bytes();

        let mut converted = Message::new(receipt_handle, body);
        if let Some(attributes) = message.message_attributes {
            for (key, value) in attributes {
                if let Some(text) = value.string_value() {
                    converted = converted.with_attribute(key, text);
                }
            }
        }
        if let Some(count) = message
            .attributes
            .as_ref()
            .and_then(|a| a.get(&MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|c| c.parse().ok())
        {
            converted = converted.with_receive_count(count);
        }
        Some(converted)
    }
}

impl QueueClient for SqsQueue {
    async fn receive_batch(
        &self,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<Message>, TransportError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            // SQS caps these at 10 messages and 20 seconds.
            .max_number_of_messages(max_messages.min(10) as i32)
            .wait_time_seconds(wait_time.as_secs().min(20) as i32)
            .message_attribute_names("All")
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(Self::convert)
            .collect())
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), AckError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_receipt_handle_is_invalid())
                {
                    AckError::AlreadyDeleted
                } else {
                    AckError::Transport(TransportError::new(e.to_string()))
                }
            })?;
        Ok(())
    }

    async fn extend_visibility(
        &self,
        message: &Message,
        duration: Duration,
    ) -> Result<(), TransportError> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .visibility_timeout(duration.as_secs() as i32)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        Ok(())
    }
}

struct EchoHandler;

#[async_trait]
impl Handler<Vec<u8>> for EchoHandler {
    async fn handle(
        &self,
        payload: &Vec<u8>,
        ctx: &MessageContext<'_>,
    ) -> Result<(), HandlerError> {
        tracing::info!(
            pattern = ctx.pattern,
            receive_count = ctx.receive_count,
            body = %String::from_utf8_lossy(payload),
            "handled message"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let queue_url = std::env::var("SQS_QUEUE_URL").context("SQS_QUEUE_URL is not set")?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let queue = SqsQueue::new(aws_sdk_sqs::Client::new(&aws_config), queue_url);

    let mut handlers: HashMap<String, Arc<dyn Handler<Vec<u8>>>> = HashMap::new();
    handlers.insert("echo".to_string(), Arc::new(EchoHandler));

    let config = ConsumerConfig::default()
        .with_batch_size(10)
        .with_max_concurrency(32)
        .with_poll_wait_time(Duration::from_secs(20))
        .with_per_message_timeout(Duration::from_secs(120))
        .with_extend_visibility_on_slow_handler(true);

    let consumer = ConsumerController::new(queue, Dispatcher::new(IdentityCodec, handlers), config);
    consumer.start(|| tracing::info!("sqs consumer ready")).await;

    tokio::signal::ctrl_c().await?;
    consumer.stop().await;

    Ok(())
}
