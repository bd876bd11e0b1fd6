//! Task Dispatcher
//!
//! A bounded task queue drained by a fixed pool of worker tasks, decoupling
//! connection I/O from request processing. `submit` fails fast with
//! [`McpError::QueueFull`] when the queue is at capacity; the caller drops
//! the message rather than growing without bound. Every accepted task
//! carries a drain guard so `active_requests` accounting survives panics
//! and cancellation.

use {
    crate::error::{McpError, McpResult},
    crate::shutdown::{RequestGuard, ShutdownCoordinator},
    async_trait::async_trait,
    std::sync::Arc,
    tokio::sync::{mpsc, oneshot, Mutex},
    tracing::{debug, warn},
};

/// Processes one raw payload into an optional response string.
///
/// Implemented by the message router; abstracted here so the dispatcher can
/// be exercised without a full server.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, payload: &[u8]) -> Option<String>;
}

/// One unit of work: a copied payload plus the reply channel back to the
/// connection loop that produced it. The payload is copied because the
/// connection reuses or releases its receive buffer immediately after
/// handoff.
struct Task {
    payload: Vec<u8>,
    reply: oneshot::Sender<Option<String>>,
    _guard: RequestGuard,
}

/// Cloneable handle to the worker pool.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Task>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Dispatcher {
    /// Spawn `worker_count` workers draining a queue of `queue_capacity`.
    /// Workers exit once every `Dispatcher` clone has been dropped and the
    /// queue has drained.
    pub fn start(
        worker_count: usize,
        queue_capacity: usize,
        processor: Arc<dyn MessageProcessor>,
        coordinator: Arc<ShutdownCoordinator>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Task>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..worker_count.max(1) {
            let rx = Arc::clone(&rx);
            let processor = Arc::clone(&processor);
            tokio::spawn(async move {
                debug!(worker_id = worker_id, "Dispatcher worker started");
                loop {
                    let task = { rx.lock().await.recv().await };
                    let Some(task) = task else {
                        break;
                    };
                    let response = processor.process(&task.payload).await;
                    // Receiver may be gone if the connection closed mid-flight
                    let _ = task.reply.send(response);
                    // _guard drops here, decrementing active_requests
                }
                debug!(worker_id = worker_id, "Dispatcher worker stopped");
            });
        }

        Self { tx, coordinator }
    }

    /// Enqueue a payload for processing.
    ///
    /// Returns the receiver on which the response (or `None` for
    /// no-response messages) will arrive. Fails fast with `QueueFull` when
    /// the queue is at capacity and `ShuttingDown` once shutdown has been
    /// requested; in both cases the message is not accounted as in-flight.
    pub fn submit(&self, payload: Vec<u8>) -> McpResult<oneshot::Receiver<Option<String>>> {
        let guard = self
            .coordinator
            .begin_request()
            .ok_or(McpError::ShuttingDown)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let task = Task {
            payload,
            reply: reply_tx,
            _guard: guard,
        };

        match self.tx.try_send(task) {
            Ok(()) => Ok(reply_rx),
            Err(mpsc::error::TrySendError::Full(_task)) => {
                warn!("Task queue full, rejecting message");
                // _task (and its guard) drops here: the rejected message
                // never counts as in-flight
                Err(McpError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_task)) => Err(McpError::ShuttingDown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct EchoProcessor;

    #[async_trait]
    impl MessageProcessor for EchoProcessor {
        async fn process(&self, payload: &[u8]) -> Option<String> {
            Some(String::from_utf8_lossy(payload).to_string())
        }
    }

    /// Blocks every worker until permits are released, so the queue can be
    /// filled deterministically.
    struct GatedProcessor {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl MessageProcessor for GatedProcessor {
        async fn process(&self, _payload: &[u8]) -> Option<String> {
            self.gate.acquire().await.unwrap().forget();
            Some("done".to_string())
        }
    }

    #[tokio::test]
    async fn responses_flow_back_through_reply_channel() {
        let coordinator = ShutdownCoordinator::new();
        let dispatcher = Dispatcher::start(2, 8, Arc::new(EchoProcessor), coordinator);

        let rx = dispatcher.submit(b"hello".to_vec()).unwrap();
        let response = rx.await.unwrap();
        assert_eq!(response.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn queue_full_fails_fast_and_drains_to_zero() {
        let coordinator = ShutdownCoordinator::new();
        let gate = Arc::new(Semaphore::new(0));
        let processor = Arc::new(GatedProcessor {
            gate: Arc::clone(&gate),
        });
        let dispatcher = Dispatcher::start(1, 2, processor, Arc::clone(&coordinator));

        // Fill the single worker plus the queue, then expect rejection.
        let mut accepted = Vec::new();
        let mut saw_queue_full = false;
        for i in 0..16 {
            match dispatcher.submit(format!("msg-{i}").into_bytes()) {
                Ok(rx) => accepted.push(rx),
                Err(McpError::QueueFull) => {
                    saw_queue_full = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(saw_queue_full, "queue never reported full");
        // capacity 2 + at most 1 in the worker's hands
        assert!(accepted.len() <= 3);
        assert_eq!(coordinator.active_requests(), accepted.len());

        // Release the workers and let every accepted task complete.
        gate.add_permits(accepted.len());
        for rx in accepted {
            assert_eq!(rx.await.unwrap().as_deref(), Some("done"));
        }

        assert!(
            coordinator
                .wait_for_drain(Duration::from_secs(1))
                .await
        );
        assert_eq!(coordinator.active_requests(), 0);
    }

    #[tokio::test]
    async fn submit_is_rejected_during_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let dispatcher = Dispatcher::start(1, 4, Arc::new(EchoProcessor), Arc::clone(&coordinator));
        coordinator.request_shutdown();

        let result = dispatcher.submit(b"late".to_vec());
        assert!(matches!(result, Err(McpError::ShuttingDown)));
    }
}
