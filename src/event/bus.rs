use super::{NewEvent, StreamEvent};
use chrono::Utc;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, warn};
use uuid::Uuid;

type Listener = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

struct BusState {
    history: VecDeque<StreamEvent>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

struct BusInner {
    capacity: usize,
    state: Mutex<BusState>,
}

impl BusInner {
    fn lock(&self) -> MutexGuard<'_, BusState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Event bus lock poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn detach(&self, listener_id: u64) {
        self.lock().listeners.retain(|(id, _)| *id != listener_id);
    }
}

/// In-process publish/subscribe channel feeding the activity views.
///
/// The bus keeps the last `capacity` events so that a view attaching late can
/// replay them. Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("EventBus")
            .field("capacity", &self.inner.capacity)
            .field("history", &state.history.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

/// Handle returned by [`EventBus::subscribe`]; the listener stays attached
/// until the handle is dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping the subscription detaches the listener"]
pub struct Subscription {
    bus: Weak<BusInner>,
    listener_id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.detach(self.listener_id);
        }
    }
}

impl EventBus {
    /// Creates a bus keeping at most `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                capacity: capacity.max(1),
                state: Mutex::new(BusState {
                    history: VecDeque::with_capacity(capacity.max(1)),
                    listeners: Vec::new(),
                    next_listener_id: 0,
                }),
            }),
        }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Attaches a listener called synchronously for every published event.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.attach(Arc::new(listener)).0
    }

    /// Like [`EventBus::subscribe`], but first hands the current history to
    /// the listener, oldest first.
    pub fn subscribe_with_replay<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let (subscription, history) = self.attach(listener.clone());
        for event in &history {
            notify(&listener, event);
        }
        subscription
    }

    /// Subscribes through an unbounded channel, for consumers living in an
    /// async task. With `replay`, the history is queued on the channel
    /// ahead of new events.
    pub fn subscribe_channel(
        &self,
        replay: bool,
    ) -> (Subscription, UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = unbounded_channel();
        let forward = move |event: &StreamEvent| {
            let _ = tx.send(event.clone());
        };
        let subscription = if replay {
            self.subscribe_with_replay(forward)
        } else {
            self.subscribe(forward)
        };
        (subscription, rx)
    }

    fn attach(&self, listener: Listener) -> (Subscription, Vec<StreamEvent>) {
        let mut state = self.inner.lock();
        let listener_id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((listener_id, listener));
        let history = state.history.iter().cloned().collect();
        debug!("Listener {} attached to event bus", listener_id);
        (
            Subscription {
                bus: Arc::downgrade(&self.inner),
                listener_id,
            },
            history,
        )
    }

    /// Stamps the event with an id and the current time, records it and
    /// notifies every listener in subscription order.
    pub fn publish(&self, event: NewEvent) -> StreamEvent {
        let event = StreamEvent {
            id: Uuid::new_v4().to_string(),
            kind: event.kind,
            content: event.content,
            timestamp: Utc::now(),
            agent_id: event.agent_id,
            task_id: event.task_id,
            metadata: event.metadata,
        };

        let listeners: Vec<Listener> = {
            let mut state = self.inner.lock();
            state.history.push_back(event.clone());
            while state.history.len() > self.inner.capacity {
                state.history.pop_front();
            }
            state
                .listeners
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect()
        };

        for listener in &listeners {
            notify(listener, &event);
        }
        event
    }

    /// Snapshot of the history, newest last.
    pub fn recent(&self) -> Vec<StreamEvent> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().history.clear();
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

fn notify(listener: &Listener, event: &StreamEvent) {
    if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
        warn!("Event listener panicked while handling event {}", event.id);
    }
}
