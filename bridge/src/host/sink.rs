//! Channel sinks handed to the capability provider.
//!
//! Each sink is bound to one operation and one channel. Status methods take
//! `&self` and may be called any number of times; terminal methods consume
//! the sink. Dropping a sink without a terminal reports `CANCELED` if the
//! operation was canceled and `INTERNAL` otherwise.
//!
//! Every channel's terminal is claimed through a flag shared with the
//! operation's [`Expiry`], so a reaped operation and a late provider never
//! both end the same channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use latchkey_types::{
    ActionBluetoothStatus, ActionInternetStatus, CardInfo, ErrorCode, ErrorInfo, Hardware,
    OperationId, SyncStatus,
};
use serde::Serialize;
use serde_json::Value;

use crate::card::CardSessionHolder;
use crate::convert::{NativeFailure, convert_failure};
use crate::event::{Event, EventEmitter, EventName};
use crate::progress::{ActionProgress, Channel};
use crate::provider::CardHandle;
use crate::registry::OperationRegistry;

pub(crate) enum Completion {
    Single,
    Action {
        progress: Arc<Mutex<ActionProgress>>,
        channel: Channel,
    },
}

fn payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to serialize event payload");
        Value::Null
    })
}

pub(crate) struct SinkCore {
    op_id: OperationId,
    emitter: EventEmitter,
    registry: Arc<OperationRegistry>,
    canceled: Arc<AtomicBool>,
    completion: Completion,
    error_event: EventName,
    ended: Arc<AtomicBool>,
    detached: bool,
}

impl SinkCore {
    pub(crate) fn new(
        op_id: OperationId,
        emitter: EventEmitter,
        registry: Arc<OperationRegistry>,
        canceled: Arc<AtomicBool>,
        completion: Completion,
        error_event: EventName,
    ) -> Self {
        Self {
            op_id,
            emitter,
            registry,
            canceled,
            completion,
            error_event,
            ended: Arc::new(AtomicBool::new(false)),
            detached: false,
        }
    }

    /// A twin sharing this channel's terminal claim that stays silent on drop.
    pub(crate) fn detached(&self) -> Self {
        let completion = match &self.completion {
            Completion::Single => Completion::Single,
            Completion::Action { progress, channel } => Completion::Action {
                progress: Arc::clone(progress),
                channel: *channel,
            },
        };
        Self {
            op_id: self.op_id.clone(),
            emitter: self.emitter.clone(),
            registry: Arc::clone(&self.registry),
            canceled: Arc::clone(&self.canceled),
            completion,
            error_event: self.error_event,
            ended: Arc::clone(&self.ended),
            detached: true,
        }
    }

    fn event(&self, name: EventName) -> Event {
        Event::new(name, &self.op_id)
    }

    fn emit(&self, event: Event) {
        self.emitter.emit(event);
    }

    fn finish(&mut self, event: Event) {
        if self.ended.swap(true, Ordering::SeqCst) {
            tracing::trace!(op_id = %self.op_id, event = %event.name, "channel already ended; dropping terminal");
            return;
        }
        self.emitter.emit(event);
        match &self.completion {
            Completion::Single => {
                self.registry.retire(&self.op_id);
            }
            Completion::Action { progress, channel } => {
                let complete = progress
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .mark_done(*channel);
                if complete {
                    self.registry.retire(&self.op_id);
                }
            }
        }
    }

    fn succeed(mut self, name: EventName) {
        let event = self.event(name);
        self.finish(event);
    }

    fn fail(&mut self, error: &ErrorInfo) {
        let event = self.event(self.error_event).with("error", payload(error));
        self.finish(event);
    }
}

impl Drop for SinkCore {
    fn drop(&mut self) {
        if self.detached || self.ended.load(Ordering::SeqCst) {
            return;
        }
        let error = if self.canceled.load(Ordering::SeqCst) {
            ErrorInfo::canceled("operation canceled")
        } else {
            tracing::warn!(
                op_id = %self.op_id,
                event = %self.error_event,
                "provider dropped a channel without reporting a result"
            );
            ErrorInfo::internal("provider dropped the operation without reporting a result")
        };
        self.fail(&error);
    }
}

/// Ends, on reap, every channel of one operation that has not reported yet.
#[derive(Default)]
pub(crate) struct Expiry {
    channels: Vec<SinkCore>,
}

impl Expiry {
    pub(crate) fn watch(&mut self, core: &SinkCore) {
        self.channels.push(core.detached());
    }

    pub(crate) fn expire(self) {
        let error = ErrorInfo::new(
            ErrorCode::Timeout,
            "operation expired before reporting a result",
        );
        for mut core in self.channels {
            core.fail(&error);
        }
    }
}

/// Discovery scan channel.
pub struct ScanSink {
    core: SinkCore,
}

impl ScanSink {
    pub(crate) fn new(core: SinkCore) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.core.op_id
    }

    /// Duplicates are reported as-is.
    pub fn discover(&self, hardware: &Hardware) {
        self.core.emit(
            self.core
                .event(EventName::ScanDiscover)
                .with("hardware", payload(hardware)),
        );
    }

    pub fn success(self) {
        self.core.succeed(EventName::ScanSuccess);
    }

    pub fn error(mut self, failure: impl Into<NativeFailure>) {
        self.core.fail(&convert_failure(failure.into()));
    }
}

/// Synchronization channel.
pub struct SyncSink {
    core: SinkCore,
}

impl SyncSink {
    pub(crate) fn new(core: SinkCore) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.core.op_id
    }

    pub fn status(&self, status: SyncStatus) {
        self.core.emit(
            self.core
                .event(EventName::SyncStatus)
                .with("status", payload(&status)),
        );
    }

    pub fn progress(&self, percent: f64) {
        self.core.emit(
            self.core
                .event(EventName::SyncStatusProgress)
                .with("percent", Value::from(percent)),
        );
    }

    pub fn success(self) {
        self.core.succeed(EventName::SyncSuccess);
    }

    pub fn error(mut self, failure: impl Into<NativeFailure>) {
        self.core.fail(&convert_failure(failure.into()));
    }
}

/// Overall outcome of an action.
pub struct ActionSink {
    core: SinkCore,
}

impl ActionSink {
    pub(crate) fn new(core: SinkCore) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.core.op_id
    }

    pub fn success(self) {
        self.core.succeed(EventName::ActionSuccess);
    }

    pub fn error(mut self, failure: impl Into<NativeFailure>) {
        self.core.fail(&convert_failure(failure.into()));
    }
}

/// Internet path of an action.
pub struct InternetSink {
    core: SinkCore,
}

impl InternetSink {
    pub(crate) fn new(core: SinkCore) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.core.op_id
    }

    pub fn status(&self, status: ActionInternetStatus) {
        self.core.emit(
            self.core
                .event(EventName::ActionStatusInternet)
                .with("status", payload(&status)),
        );
    }

    pub fn success(self) {
        self.core.succeed(EventName::ActionInternetSuccess);
    }

    pub fn error(mut self, failure: impl Into<NativeFailure>) {
        self.core.fail(&convert_failure(failure.into()));
    }
}

/// Bluetooth path of an action.
pub struct BluetoothSink {
    core: SinkCore,
}

impl BluetoothSink {
    pub(crate) fn new(core: SinkCore) -> Self {
        Self { core }
    }

    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.core.op_id
    }

    pub fn status(&self, status: ActionBluetoothStatus) {
        self.core.emit(
            self.core
                .event(EventName::ActionStatusBluetooth)
                .with("status", payload(&status)),
        );
    }

    pub fn progress(&self, percent: f64) {
        self.core.emit(
            self.core
                .event(EventName::ActionBluetoothStatusProgress)
                .with("percent", Value::from(percent)),
        );
    }

    pub fn success(self) {
        self.core.succeed(EventName::ActionBluetoothSuccess);
    }

    pub fn error(mut self, failure: impl Into<NativeFailure>) {
        self.core.fail(&convert_failure(failure.into()));
    }
}

/// Card scan channel. A successful scan replaces the held card.
pub struct CardScanSink {
    core: SinkCore,
    cards: Arc<CardSessionHolder>,
}

impl CardScanSink {
    pub(crate) fn new(core: SinkCore, cards: Arc<CardSessionHolder>) -> Self {
        Self { core, cards }
    }

    #[must_use]
    pub fn op_id(&self) -> &OperationId {
        &self.core.op_id
    }

    pub fn success(mut self, card: Box<dyn CardHandle>) {
        let info = CardInfo::new(card.uid(), card.is_akiles_card());
        self.cards.on_scan_success(card);
        let event = self
            .core
            .event(EventName::ScanCardSuccess)
            .with("card", payload(&info));
        self.core.finish(event);
    }

    pub fn error(mut self, failure: impl Into<NativeFailure>) {
        self.core.fail(&convert_failure(failure.into()));
    }
}
