//! Event correlation bus.
//!
//! Events on the shared stream are routed by their `opId` to the one handler
//! set subscribed for that operation; everything else is dropped. Handlers
//! run after the table lock is released, so a handler may unsubscribe itself
//! or start another operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use latchkey_types::OperationId;
use serde_json::Value;

use crate::event::{Event, EventName};

pub type Handler = Arc<dyn Fn(&Value, &Subscription) + Send + Sync>;

/// Event name → handler for one operation.
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: HashMap<EventName, Handler>,
}

impl HandlerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on<F>(mut self, name: EventName, handler: F) -> Self
    where
        F: Fn(&Value, &Subscription) + Send + Sync + 'static,
    {
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

struct Entry {
    token: u64,
    handlers: HandlerSet,
}

#[derive(Default)]
struct Table {
    entries: Mutex<HashMap<OperationId, Entry>>,
    next_token: AtomicU64,
}

impl Table {
    fn lock(&self) -> MutexGuard<'_, HashMap<OperationId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Capability to remove one subscription. Idempotent; safe from a handler.
#[derive(Clone)]
pub struct Subscription {
    table: Weak<Table>,
    op_id: OperationId,
    token: u64,
}

impl Subscription {
    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.op_id
    }

    pub fn unsubscribe(&self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut entries = table.lock();
        // The token guards against removing a later subscription for the same id.
        if entries.get(&self.op_id).is_some_and(|e| e.token == self.token) {
            entries.remove(&self.op_id);
            drop(entries);
            tracing::debug!(op_id = %self.op_id, "unsubscribed");
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.table.upgrade().is_some_and(|table| {
            table
                .lock()
                .get(&self.op_id)
                .is_some_and(|e| e.token == self.token)
        })
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("op_id", &self.op_id)
            .field("token", &self.token)
            .finish()
    }
}

#[derive(Default, Clone)]
pub struct EventBus {
    table: Arc<Table>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing subscription for `op_id`.
    pub fn subscribe(&self, op_id: OperationId, handlers: HandlerSet) -> Subscription {
        let mut entries = self.table.lock();
        self.insert(&mut entries, op_id, handlers)
    }

    /// Run `start` and install `handlers` for the id it returns, as one step.
    ///
    /// The table lock is held while `start` runs, so no event for the new
    /// operation can be dispatched before its handlers are in place. `start`
    /// must not call back into this bus.
    pub fn subscribe_with<F>(&self, start: F, handlers: HandlerSet) -> Subscription
    where
        F: FnOnce() -> OperationId,
    {
        let mut entries = self.table.lock();
        let op_id = start();
        self.insert(&mut entries, op_id, handlers)
    }

    fn insert(
        &self,
        entries: &mut HashMap<OperationId, Entry>,
        op_id: OperationId,
        handlers: HandlerSet,
    ) -> Subscription {
        let token = self.table.next_token.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(op_id = %op_id, handlers = handlers.len(), "subscribed");
        if entries
            .insert(op_id.clone(), Entry { token, handlers })
            .is_some()
        {
            tracing::warn!(op_id = %op_id, "replaced existing subscription");
        }
        Subscription {
            table: Arc::downgrade(&self.table),
            op_id,
            token,
        }
    }

    /// Route one event. Returns whether a handler ran.
    pub fn dispatch(&self, event: &Event) -> bool {
        let Some(op_id) = event.op_id() else {
            tracing::warn!(event = %event.name, "event without opId dropped");
            return false;
        };

        let target = {
            let entries = self.table.lock();
            entries.get_key_value(op_id).and_then(|(id, entry)| {
                entry.handlers.handlers.get(&event.name).map(|handler| {
                    (
                        Arc::clone(handler),
                        Subscription {
                            table: Arc::downgrade(&self.table),
                            op_id: id.clone(),
                            token: entry.token,
                        },
                    )
                })
            })
        };

        match target {
            Some((handler, subscription)) => {
                handler(&event.params, &subscription);
                true
            }
            None => {
                tracing::trace!(event = %event.name, op_id, "no subscriber; event dropped");
                false
            }
        }
    }

    #[must_use]
    pub fn is_subscribed(&self, op_id: &OperationId) -> bool {
        self.table.lock().contains_key(op_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}
