//! Graceful Shutdown Coordinator
//!
//! Tracks the in-flight request count and the shutting-down flag, and owns
//! the process-wide stop signal that every connection loop observes at its
//! blocking boundaries. Shutdown blocks until in-flight work drains or a
//! timeout elapses, whichever comes first; tasks that outlive the timeout
//! are abandoned, not rolled back.

use {
    std::sync::atomic::{AtomicBool, Ordering},
    std::sync::Arc,
    std::time::Duration,
    tokio::sync::watch,
    tokio::time::{timeout_at, Instant},
    tracing::{debug, info},
};

pub struct ShutdownCoordinator {
    active: watch::Sender<usize>,
    shutting_down: AtomicBool,
    stop: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Arc<Self> {
        let (active, _) = watch::channel(0usize);
        let (stop, _) = watch::channel(false);
        Arc::new(Self {
            active,
            shutting_down: AtomicBool::new(false),
            stop,
        })
    }

    /// Account for one accepted request. Returns `None` once shutdown has
    /// been requested; the caller drops the message.
    ///
    /// The returned guard decrements the counter when dropped, so the
    /// decrement happens on every exit path of the processing scope.
    pub fn begin_request(self: &Arc<Self>) -> Option<RequestGuard> {
        if self.shutting_down.load(Ordering::Acquire) {
            debug!("Rejecting request: server is shutting down");
            return None;
        }
        self.active.send_modify(|n| *n += 1);
        Some(RequestGuard {
            coordinator: Arc::clone(self),
        })
    }

    /// Current number of in-flight requests.
    pub fn active_requests(&self) -> usize {
        *self.active.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Flip the shutting-down flag and wake every loop watching the stop
    /// signal. Idempotent.
    pub fn request_shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::AcqRel) {
            info!("Shutdown requested");
            let _ = self.stop.send(true);
        }
    }

    /// A receiver for the process-wide stop signal. Connection loops select
    /// on `changed()` at every blocking boundary.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    /// Block until `active_requests` reaches 0 or `timeout` elapses.
    /// Returns `true` when the server drained, `false` on timeout.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut rx = self.active.subscribe();
        loop {
            if *rx.borrow_and_update() == 0 {
                return true;
            }
            match timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                // Sender dropped: coordinator is going away, treat as drained
                Ok(Err(_)) => return true,
                Err(_) => {
                    let remaining = *rx.borrow();
                    if remaining > 0 {
                        info!(
                            abandoned = remaining,
                            "Drain timeout elapsed with requests still in flight"
                        );
                    }
                    return remaining == 0;
                }
            }
        }
    }
}

/// Scope guard for one in-flight request.
pub struct RequestGuard {
    coordinator: Arc<ShutdownCoordinator>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.coordinator.active.send_modify(|n| {
            *n = n.saturating_sub(1);
        });
    }
}
