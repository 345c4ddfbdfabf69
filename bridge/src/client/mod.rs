//! Consumer side of the boundary.
//!
//! Each driver calls the native surface, subscribes a handler set for the
//! returned identity and hands back a [`PendingOperation`]. Status reaches the
//! caller through a callback trait; the terminal outcome also resolves the
//! pending operation's future (the global terminal, for actions).

mod action;
mod card;
mod scan;
mod sync;

use std::sync::{Arc, Mutex, PoisonError};

use latchkey_types::{ActionOptions, ErrorInfo, OperationId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::bus::{EventBus, HandlerSet, Subscription};
use crate::event::field;
use crate::native::NativeModule;

pub use action::ActionCallback;
pub use card::{Card, ScanCardCallback};
pub use scan::ScanCallback;
pub use sync::SyncCallback;

/// Resolves a pending operation at most once.
pub(crate) struct Outcome<T> {
    tx: Mutex<Option<oneshot::Sender<Result<T, ErrorInfo>>>>,
}

impl<T> Outcome<T> {
    fn channel() -> (Arc<Self>, oneshot::Receiver<Result<T, ErrorInfo>>) {
        let (tx, rx) = oneshot::channel();
        let outcome = Self {
            tx: Mutex::new(Some(tx)),
        };
        (Arc::new(outcome), rx)
    }

    fn resolve(&self, result: Result<T, ErrorInfo>) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            // Caller may have dropped the pending operation.
            let _ = tx.send(result);
        }
    }
}

/// Decode a non-terminal payload field; malformed payloads are logged and skipped.
fn decode<T: DeserializeOwned>(params: &Value, key: &str, sub: &Subscription) -> Option<T> {
    match field(params, key) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(op_id = %sub.op_id(), key, %err, "malformed event payload");
            None
        }
    }
}

/// Decode the `error` field of a terminal event. A malformed error is itself
/// reported as `INTERNAL` so the channel still terminates.
fn decode_error(params: &Value, sub: &Subscription) -> ErrorInfo {
    field(params, "error").unwrap_or_else(|err| {
        tracing::warn!(op_id = %sub.op_id(), %err, "malformed error payload");
        ErrorInfo::internal(format!("malformed error payload: {err}"))
    })
}

/// Cancels one operation. Cheap to clone and safe to call repeatedly.
#[derive(Clone)]
pub struct Canceler {
    native: Arc<dyn NativeModule>,
    id: OperationId,
}

impl Canceler {
    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.id
    }

    /// Does not itself guarantee a terminal event; the channel still ends
    /// with whatever the provider reports, usually `CANCELED`.
    pub fn cancel(&self) {
        tracing::debug!(op_id = %self.id, "cancel requested");
        self.native.cancel(&self.id);
    }
}

impl std::fmt::Debug for Canceler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Canceler").field(&self.id).finish()
    }
}

/// A started operation awaiting its terminal outcome.
///
/// Dropping it does not cancel the operation; callbacks keep firing.
pub struct PendingOperation<T> {
    canceler: Canceler,
    subscription: Subscription,
    outcome: oneshot::Receiver<Result<T, ErrorInfo>>,
}

impl<T> PendingOperation<T> {
    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.canceler.id
    }

    #[must_use]
    pub fn canceler(&self) -> Canceler {
        self.canceler.clone()
    }

    pub fn cancel(&self) {
        self.canceler.cancel();
    }

    /// Whether the client is still listening for this operation's events.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.subscription.is_active()
    }

    pub async fn wait(self) -> Result<T, ErrorInfo> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => Err(ErrorInfo::internal("operation ended without a result")),
        }
    }
}

#[derive(Clone)]
pub struct Client {
    native: Arc<dyn NativeModule>,
    bus: EventBus,
}

impl Client {
    #[must_use]
    pub fn new(native: Arc<dyn NativeModule>, bus: EventBus) -> Self {
        Self { native, bus }
    }

    /// Request/response calls (sessions, catalog, capability checks).
    #[must_use]
    pub fn native(&self) -> &Arc<dyn NativeModule> {
        &self.native
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn start<T, S, H>(&self, start: S, handlers: H) -> PendingOperation<T>
    where
        S: FnOnce(&dyn NativeModule) -> OperationId,
        H: FnOnce(Arc<Outcome<T>>) -> HandlerSet,
    {
        let (outcome, rx) = Outcome::channel();
        let handlers = handlers(outcome);
        let native = Arc::clone(&self.native);
        let subscription = self
            .bus
            .subscribe_with(|| start(native.as_ref()), handlers);
        PendingOperation {
            canceler: Canceler {
                native,
                id: subscription.op_id().clone(),
            },
            subscription,
            outcome: rx,
        }
    }

    /// Discover nearby hardware.
    pub fn scan(&self, callback: Arc<dyn ScanCallback>) -> PendingOperation<()> {
        self.start(|native| native.scan(), |outcome| scan::handlers(callback, outcome))
    }

    /// Synchronize one hardware over Bluetooth.
    pub fn sync(
        &self,
        session_id: &str,
        hardware_id: &str,
        callback: Arc<dyn SyncCallback>,
    ) -> PendingOperation<()> {
        self.start(
            |native| native.sync(session_id, hardware_id),
            |outcome| sync::handlers(callback, outcome),
        )
    }

    /// Run a gadget action over every enabled path.
    ///
    /// Resolves on the global outcome. Path callbacks may keep firing after
    /// that; the client keeps listening until all three channels have ended.
    pub fn action(
        &self,
        session_id: &str,
        gadget_id: &str,
        action_id: &str,
        options: ActionOptions,
        callback: Arc<dyn ActionCallback>,
    ) -> PendingOperation<()> {
        self.start(
            |native| native.action(session_id, gadget_id, action_id, options),
            |outcome| action::handlers(callback, outcome),
        )
    }

    /// Scan a contactless card over NFC.
    pub fn scan_card(&self, callback: Arc<dyn ScanCardCallback>) -> PendingOperation<Card> {
        let card_native = Arc::clone(&self.native);
        self.start(
            |native| native.scan_card(),
            |outcome| card::handlers(callback, card_native, outcome),
        )
    }
}
