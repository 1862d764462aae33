use super::InferenceError;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

type QueuedRequest = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueueState {
    pending: VecDeque<QueuedRequest>,
    draining: bool,
    last_completed: Option<Instant>,
    dispatched: u64,
}

struct QueueInner {
    min_interval: Duration,
    state: Mutex<QueueState>,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Request queue lock poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }
}

/// FIFO queue letting a single request reach the provider at a time.
///
/// Units submitted while another one runs wait their turn; between two
/// dispatches at least `min_interval` elapses, measured from the completion
/// of the previous unit. Clones share the same queue.
#[derive(Clone)]
pub struct RequestSerializer {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for RequestSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("RequestSerializer")
            .field("min_interval", &self.inner.min_interval)
            .field("pending", &state.pending.len())
            .field("draining", &state.draining)
            .field("dispatched", &state.dispatched)
            .finish()
    }
}

impl RequestSerializer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                min_interval,
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    draining: false,
                    last_completed: None,
                    dispatched: 0,
                }),
            }),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Units waiting for their turn.
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Units started since the queue was created.
    pub fn dispatched(&self) -> u64 {
        self.inner.lock().dispatched
    }

    /// Queues `unit` and resolves with its result once it has run.
    ///
    /// A failing or panicking unit only fails its own submission. Dropping the
    /// returned future does not withdraw the unit from the queue.
    pub async fn submit<F, T>(&self, unit: F) -> Result<T, InferenceError>
    where
        F: Future<Output = Result<T, InferenceError>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request: QueuedRequest = Box::pin(async move {
            let result = match AssertUnwindSafe(unit).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(InferenceError::Transport(
                    "request worker panicked".to_string(),
                )),
            };
            let _ = reply_tx.send(result);
        });

        let start_drain = {
            let mut state = self.inner.lock();
            state.pending.push_back(request);
            debug!("Request queued ({} pending)", state.pending.len());
            !std::mem::replace(&mut state.draining, true)
        };
        if start_drain {
            tokio::spawn(drain(self.inner.clone()));
        }

        reply_rx.await.map_err(|_| InferenceError::QueueClosed)?
    }
}

async fn drain(inner: Arc<QueueInner>) {
    loop {
        let (request, wait) = {
            let mut state = inner.lock();
            let Some(request) = state.pending.pop_front() else {
                state.draining = false;
                return;
            };
            let wait = state
                .last_completed
                .map(|at| inner.min_interval.saturating_sub(at.elapsed()))
                .unwrap_or_default();
            (request, wait)
        };

        if !wait.is_zero() {
            debug!("Waiting {:?} before next dispatch", wait);
            tokio::time::sleep(wait).await;
        }

        inner.lock().dispatched += 1;
        request.await;
        inner.lock().last_completed = Some(Instant::now());
    }
}
