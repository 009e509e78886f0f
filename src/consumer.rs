//! Public consumer lifecycle: start, stop, status.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::batch::BatchProcessor;
use crate::codec::Codec;
use crate::config::ConsumerConfig;
use crate::dispatch::{AttributePattern, Dispatcher, HandlerRegistry, PatternExtractor};
use crate::poll_loop::PollLoop;
use crate::queue_client::QueueClient;

/// Lifecycle state of a consumer.
///
/// Created `Stopped`; `start` moves through `Starting` to `Running`;
/// `stop` moves through `Stopping` back to `Stopped`. Transitions only
/// happen under the controller's lifecycle guard, so two loops can never
/// run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Lifecycle {
    shutdown_tx: Option<watch::Sender<bool>>,
    loop_handle: Option<JoinHandle<()>>,
}

/// Owns one poll loop and exposes the start/stop/status surface.
///
/// `start` and `stop` are idempotent and serialized against each other:
/// starting a running consumer logs a warning and does nothing, stopping
/// a stopped one is a no-op. `stop` waits for the in-flight batch to
/// finish (handlers already dispatched complete or hit their per-message
/// timeout) before returning.
pub struct ConsumerController<Q, C, R, E = AttributePattern> {
    queue: Arc<Q>,
    dispatcher: Arc<Dispatcher<C, R, E>>,
    config: Arc<ConsumerConfig>,
    state: StdMutex<ConsumerState>,
    lifecycle: Mutex<Lifecycle>,
}

impl<Q, C, R, E> ConsumerController<Q, C, R, E>
where
    Q: QueueClient + 'static,
    C: Codec + 'static,
    R: HandlerRegistry<C::Value> + 'static,
    E: PatternExtractor<C::Value> + 'static,
{
    pub fn new(queue: Q, dispatcher: Dispatcher<C, R, E>, config: ConsumerConfig) -> Self {
        Self {
            queue: Arc::new(queue),
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
            state: StdMutex::new(ConsumerState::Stopped),
            lifecycle: Mutex::new(Lifecycle {
                shutdown_tx: None,
                loop_handle: None,
            }),
        }
    }

    /// Spawn the poll loop and invoke `on_ready` once it is live.
    ///
    /// Idempotent: calling `start` on a consumer that is already running
    /// (or mid-transition) logs a warning and returns without spawning a
    /// second loop.
    pub async fn start<F>(&self, on_ready: F)
    where
        F: FnOnce(),
    {
        let mut lifecycle = self.lifecycle.lock().await;

        {
            let mut state = self.lock_state();
            match *state {
                ConsumerState::Stopped => *state = ConsumerState::Starting,
                current => {
                    tracing::warn!(state = ?current, "consumer already started, ignoring start");
                    return;
                }
            }
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let processor = BatchProcessor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.config),
        );
        let poll_loop = PollLoop::new(
            Arc::clone(&self.queue),
            processor,
            Arc::clone(&self.config),
            shutdown_rx,
        );

        lifecycle.shutdown_tx = Some(shutdown_tx);
        lifecycle.loop_handle = Some(tokio::spawn(poll_loop.run()));
        *self.lock_state() = ConsumerState::Running;
        drop(lifecycle);

        tracing::info!("consumer started");
        on_ready();
    }

    /// Signal the poll loop to stop and wait for it to finish.
    ///
    /// No new batch starts after this is called; the in-flight batch (if
    /// any) completes first. Idempotent when already stopped.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        {
            let mut state = self.lock_state();
            match *state {
                ConsumerState::Stopped => {
                    tracing::debug!("consumer already stopped");
                    return;
                }
                _ => *state = ConsumerState::Stopping,
            }
        }

        if let Some(shutdown_tx) = lifecycle.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = lifecycle.loop_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = ?e, "poll loop task failed during shutdown");
            }
        }

        *self.lock_state() = ConsumerState::Stopped;
        tracing::info!("consumer stopped");
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ConsumerState {
        *self.lock_state()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConsumerState> {
        // Recover the state value even if a holder panicked.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
