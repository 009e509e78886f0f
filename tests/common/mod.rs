//! Shared test fixtures: an in-memory queue and a few canned handlers.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drover::{
    AckError, Handler, HandlerError, Message, MessageContext, QueueClient, TransportError,
};

/// In-memory queue double. Batches (or transport errors) are queued up
/// front and served in order; once drained, receives simulate a long poll
/// by sleeping for the requested wait time and returning empty.
#[derive(Default)]
pub struct FakeQueue {
    batches: Mutex<VecDeque<Result<Vec<Message>, TransportError>>>,
    deleted: Mutex<HashSet<String>>,
    acknowledged: Mutex<Vec<String>>,
    extend_calls: Mutex<Vec<String>>,
    receive_times: Mutex<Vec<tokio::time::Instant>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, messages: Vec<Message>) {
        self.batches.lock().unwrap().push_back(Ok(messages));
    }

    pub fn push_transport_error(&self, reason: &str) {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(reason)));
    }

    /// Pretend this receipt handle was deleted out from under us, so the
    /// next acknowledge reports `AlreadyDeleted`.
    pub fn mark_deleted(&self, receipt_handle: &str) {
        self.deleted.lock().unwrap().insert(receipt_handle.to_string());
    }

    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }

    pub fn extend_calls(&self) -> Vec<String> {
        self.extend_calls.lock().unwrap().clone()
    }

    pub fn receive_times(&self) -> Vec<tokio::time::Instant> {
        self.receive_times.lock().unwrap().clone()
    }

    pub fn receive_count(&self) -> usize {
        self.receive_times.lock().unwrap().len()
    }
}

impl QueueClient for FakeQueue {
    async fn receive_batch(
        &self,
        _max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<Message>, TransportError> {
        self.receive_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());

        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                tokio::time::sleep(wait_time).await;
                Ok(vec![])
            }
        }
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), AckError> {
        if !self
            .deleted
            .lock()
            .unwrap()
            .insert(message.receipt_handle.clone())
        {
            return Err(AckError::AlreadyDeleted);
        }
        self.acknowledged
            .lock()
            .unwrap()
            .push(message.receipt_handle.clone());
        Ok(())
    }

    async fn extend_visibility(
        &self,
        message: &Message,
        _duration: Duration,
    ) -> Result<(), TransportError> {
        self.extend_calls
            .lock()
            .unwrap()
            .push(message.receipt_handle.clone());
        Ok(())
    }
}

/// Build a message routed to `pattern` via the default attribute extractor.
pub fn routed(receipt_handle: &str, pattern: &str) -> Message {
    Message::new(receipt_handle, Vec::new()).with_attribute("pattern", pattern)
}

pub struct OkHandler;

#[async_trait]
impl Handler<Vec<u8>> for OkHandler {
    async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
        Ok(())
    }
}

pub struct FailHandler;

#[async_trait]
impl Handler<Vec<u8>> for FailHandler {
    async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
        Err("handler blew up".into())
    }
}

pub struct SleepHandler {
    pub delay: Duration,
}

#[async_trait]
impl Handler<Vec<u8>> for SleepHandler {
    async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Tracks how many invocations run concurrently and the peak reached.
pub struct GaugeHandler {
    pub delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeHandler {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler<Vec<u8>> for GaugeHandler {
    async fn handle(&self, _: &Vec<u8>, _: &MessageContext<'_>) -> Result<(), HandlerError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
