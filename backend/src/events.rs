//! # Change Notification Bus
//!
//! Decouples entity mutations from the views that need to refresh.
//! Services publish a named event after every write; subscribed views
//! re-query the stores instead of polling.
//!
//! The bus is an explicit object handed to every service rather than a
//! process-wide global, so independent instances (one per test, for
//! example) cannot cross-talk.

use log::error;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// The closed set of event names published by the backend.
///
/// `SessionChanged` fires alongside every session-specific event, so
/// consumers that only care about "something about sessions changed"
/// subscribe to it alone instead of all five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionCreated,
    SessionUpdated,
    SessionCompleted,
    SessionCancelled,
    SessionDeleted,
    SessionChanged,
    TaskListUpdate,
    StudentUpdated,
    NoteAdded,
    NoteUpdated,
    NoteDeleted,
    BalanceTransactionAdded,
}

impl EventKind {
    /// Canonical event name, shared with any embedding UI runtime.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionCreated => "sessionCreated",
            EventKind::SessionUpdated => "sessionUpdated",
            EventKind::SessionCompleted => "sessionCompleted",
            EventKind::SessionCancelled => "sessionCancelled",
            EventKind::SessionDeleted => "sessionDeleted",
            EventKind::SessionChanged => "sessionChanged",
            EventKind::TaskListUpdate => "taskListUpdate",
            EventKind::StudentUpdated => "studentUpdated",
            EventKind::NoteAdded => "noteAdded",
            EventKind::NoteUpdated => "noteUpdated",
            EventKind::NoteDeleted => "noteDeleted",
            EventKind::BalanceTransactionAdded => "balanceTransactionAdded",
        }
    }
}

/// Envelope that carries an event name and an arbitrary detail payload.
#[derive(Clone, Debug)]
pub struct AppEvent {
    pub kind: EventKind,
    pub payload: Value,
}

impl AppEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: Value::Null,
        }
    }

    pub fn with_payload(kind: EventKind, payload: Value) -> Self {
        Self { kind, payload }
    }
}

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: HashMap<EventKind, Vec<Registration>>,
}

/// Synchronous publish/subscribe bus for entity-mutation notifications.
///
/// Handlers for a given event fire in subscription order, on the same
/// logical turn as the publish call. A panicking handler is isolated so
/// it cannot prevent later handlers from receiving the event.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind. The returned subscription
    /// removes exactly this registration when `unsubscribe` is called.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.entry(kind).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });
        Subscription {
            inner: Arc::clone(&self.inner),
            kind,
            id,
        }
    }

    /// Broadcast an event to all current subscribers of its kind.
    ///
    /// Publishing with zero subscribers is a no-op. The handler list is
    /// snapshotted before dispatch so handlers may subscribe or
    /// unsubscribe re-entrantly without deadlocking the bus.
    pub fn publish(&self, event: AppEvent) {
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock().unwrap();
            match inner.subscribers.get(&event.kind) {
                Some(registrations) => registrations
                    .iter()
                    .map(|registration| Arc::clone(&registration.handler))
                    .collect(),
                None => return,
            }
        };

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!(
                    "Event handler panicked while handling '{}'; continuing with remaining handlers",
                    event.kind.as_str()
                );
            }
        }
    }

    /// Number of live registrations for one event kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .subscribers
            .get(&kind)
            .map(|registrations| registrations.len())
            .unwrap_or(0)
    }
}

/// Handle to one registration on the bus.
pub struct Subscription {
    inner: Arc<Mutex<BusInner>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// Remove this registration. Other subscribers are untouched.
    pub fn unsubscribe(self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(registrations) = inner.subscribers.get_mut(&self.kind) {
            registrations.retain(|registration| registration.id != self.id);
        }
    }
}
