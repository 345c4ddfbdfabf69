//! Operation registry: identity → cancellation capability.
//!
//! An identity is reserved by [`OperationRegistry::begin`] before the provider
//! is called, so both startup races resolve without a stored handle leaking:
//!
//! - retired before tracked: the late [`track`](OperationRegistry::track)
//!   drops the handle.
//! - canceled before tracked: the handle is invoked as soon as it is tracked.
//! - reaped before tracked: same as canceled, and the reap hook runs too.
//!
//! Handles are always invoked after the map lock is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use latchkey_types::OperationId;

/// Capability returned by the provider to stop one operation.
pub struct CancelHandle(Box<dyn FnOnce() + Send>);

impl CancelHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(cancel))
    }

    /// A handle for operations that cannot be stopped.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn invoke(self) {
        (self.0)();
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelHandle(..)")
    }
}

enum Slot {
    Reserved {
        started: Instant,
    },
    /// `reaped` also runs the reap hook once the handle arrives.
    CancelRequested {
        started: Instant,
        reaped: bool,
    },
    Tracked {
        handle: CancelHandle,
        on_reap: Option<CancelHandle>,
        started: Instant,
    },
}

impl Slot {
    fn started(&self) -> Instant {
        match self {
            Slot::Reserved { started }
            | Slot::CancelRequested { started, .. }
            | Slot::Tracked { started, .. } => *started,
        }
    }
}

#[derive(Default)]
pub struct OperationRegistry {
    slots: Mutex<HashMap<OperationId, Slot>>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<OperationId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mint and reserve a fresh identity.
    pub fn begin(&self) -> OperationId {
        let id = OperationId::new(uuid::Uuid::new_v4().to_string());
        self.slots().insert(
            id.clone(),
            Slot::Reserved {
                started: Instant::now(),
            },
        );
        tracing::debug!(op_id = %id, "operation begun");
        id
    }

    pub fn track(&self, id: &OperationId, handle: CancelHandle) {
        self.track_inner(id, handle, None);
    }

    /// Like [`track`](Self::track), with a hook run when the entry is reaped.
    pub fn track_with_reap(&self, id: &OperationId, handle: CancelHandle, on_reap: CancelHandle) {
        self.track_inner(id, handle, Some(on_reap));
    }

    fn track_inner(&self, id: &OperationId, handle: CancelHandle, on_reap: Option<CancelHandle>) {
        let mut slots = self.slots();
        let Some(slot) = slots.remove(id) else {
            drop(slots);
            tracing::debug!(op_id = %id, "operation retired before tracking; dropping handle");
            return;
        };
        match slot {
            Slot::Reserved { started } => {
                slots.insert(
                    id.clone(),
                    Slot::Tracked {
                        handle,
                        on_reap,
                        started,
                    },
                );
                tracing::debug!(op_id = %id, "operation tracked");
            }
            Slot::CancelRequested { reaped, .. } => {
                drop(slots);
                tracing::debug!(op_id = %id, reaped, "cancel requested before tracking; invoking handle");
                if reaped && let Some(on_reap) = on_reap {
                    on_reap.invoke();
                }
                handle.invoke();
            }
            tracked @ Slot::Tracked { .. } => {
                slots.insert(id.clone(), tracked);
                drop(slots);
                tracing::warn!(op_id = %id, "operation already tracked; ignoring second handle");
            }
        }
    }

    /// Invoke and remove the handle. Unknown or retired ids are a no-op.
    pub fn cancel(&self, id: &OperationId) {
        let mut slots = self.slots();
        match slots.remove(id) {
            Some(Slot::Tracked { handle, .. }) => {
                drop(slots);
                tracing::debug!(op_id = %id, "operation canceled");
                handle.invoke();
            }
            Some(Slot::Reserved { started }) => {
                slots.insert(
                    id.clone(),
                    Slot::CancelRequested {
                        started,
                        reaped: false,
                    },
                );
                tracing::debug!(op_id = %id, "cancel requested before tracking");
            }
            Some(pending @ Slot::CancelRequested { .. }) => {
                slots.insert(id.clone(), pending);
            }
            None => {
                tracing::trace!(op_id = %id, "cancel for inactive operation ignored");
            }
        }
    }

    /// Remove without invoking. Returns whether an entry was removed.
    pub fn retire(&self, id: &OperationId) -> bool {
        let removed = self.slots().remove(id).is_some();
        if removed {
            tracing::debug!(op_id = %id, "operation retired");
        }
        removed
    }

    /// Cancel every entry older than `max_age`, running its reap hook first.
    ///
    /// Entries whose handle has not arrived yet stay reserved as canceled, so
    /// the late [`track`](Self::track) still invokes the handle and the hook.
    pub fn reap_older_than(&self, max_age: Duration) -> Vec<OperationId> {
        let now = Instant::now();
        let mut reaped = Vec::new();
        let mut hooks = Vec::new();
        {
            let mut slots = self.slots();
            let stale: Vec<OperationId> = slots
                .iter()
                .filter(|(_, slot)| {
                    !matches!(slot, Slot::CancelRequested { reaped: true, .. })
                        && now.saturating_duration_since(slot.started()) >= max_age
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in stale {
                match slots.remove(&id) {
                    Some(Slot::Tracked {
                        handle, on_reap, ..
                    }) => hooks.push((handle, on_reap)),
                    Some(Slot::Reserved { started } | Slot::CancelRequested { started, .. }) => {
                        slots.insert(
                            id.clone(),
                            Slot::CancelRequested {
                                started,
                                reaped: true,
                            },
                        );
                    }
                    None => continue,
                }
                tracing::warn!(op_id = %id, ?max_age, "reaping stale operation");
                reaped.push(id);
            }
        }

        for (handle, on_reap) in hooks {
            if let Some(on_reap) = on_reap {
                on_reap.invoke();
            }
            handle.invoke();
        }
        reaped
    }

    #[must_use]
    pub fn is_active(&self, id: &OperationId) -> bool {
        self.slots().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}
