//! Action driver: one global channel plus the internet and bluetooth paths.
//!
//! The global outcome resolves the pending operation, but the subscription
//! stays in place until all three channels have reported a terminal event,
//! in whatever order they arrive.

use std::sync::{Arc, Mutex, PoisonError};

use latchkey_types::{ActionBluetoothStatus, ActionInternetStatus, ErrorInfo};

use super::{Outcome, decode, decode_error};
use crate::bus::{HandlerSet, Subscription};
use crate::event::EventName;
use crate::progress::{ActionProgress, Channel};

/// Observer for an action. Every method defaults to a no-op.
pub trait ActionCallback: Send + Sync {
    /// The action has been performed, by whichever path got there first.
    fn on_success(&self) {}

    fn on_error(&self, _error: &ErrorInfo) {}

    fn on_internet_status(&self, _status: ActionInternetStatus) {}

    fn on_internet_success(&self) {}

    fn on_internet_error(&self, _error: &ErrorInfo) {}

    fn on_bluetooth_status(&self, _status: ActionBluetoothStatus) {}

    fn on_bluetooth_status_progress(&self, _percent: f64) {}

    fn on_bluetooth_success(&self) {}

    fn on_bluetooth_error(&self, _error: &ErrorInfo) {}
}

impl ActionCallback for () {}

fn finish(progress: &Mutex<ActionProgress>, channel: Channel, sub: &Subscription) {
    let complete = progress
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .mark_done(channel);
    tracing::debug!(op_id = %sub.op_id(), %channel, complete, "action channel finished");
    if complete {
        sub.unsubscribe();
    }
}

pub(super) fn handlers(
    callback: Arc<dyn ActionCallback>,
    outcome: Arc<Outcome<()>>,
) -> HandlerSet {
    let progress = Arc::new(Mutex::new(ActionProgress::new()));
    let mut set = HandlerSet::new();

    // Global channel.
    set = {
        let (cb, progress, outcome) = (
            Arc::clone(&callback),
            Arc::clone(&progress),
            Arc::clone(&outcome),
        );
        set.on(EventName::ActionSuccess, move |_, sub| {
            cb.on_success();
            outcome.resolve(Ok(()));
            finish(&progress, Channel::Global, sub);
        })
    };
    set = {
        let (cb, progress) = (Arc::clone(&callback), Arc::clone(&progress));
        set.on(EventName::ActionError, move |params, sub| {
            let error = decode_error(params, sub);
            cb.on_error(&error);
            outcome.resolve(Err(error));
            finish(&progress, Channel::Global, sub);
        })
    };

    // Internet path.
    set = {
        let cb = Arc::clone(&callback);
        set.on(EventName::ActionStatusInternet, move |params, sub| {
            if let Some(status) = decode(params, "status", sub) {
                cb.on_internet_status(status);
            }
        })
    };
    set = {
        let (cb, progress) = (Arc::clone(&callback), Arc::clone(&progress));
        set.on(EventName::ActionInternetSuccess, move |_, sub| {
            cb.on_internet_success();
            finish(&progress, Channel::Internet, sub);
        })
    };
    set = {
        let (cb, progress) = (Arc::clone(&callback), Arc::clone(&progress));
        set.on(EventName::ActionInternetError, move |params, sub| {
            cb.on_internet_error(&decode_error(params, sub));
            finish(&progress, Channel::Internet, sub);
        })
    };

    // Bluetooth path.
    set = {
        let cb = Arc::clone(&callback);
        set.on(EventName::ActionStatusBluetooth, move |params, sub| {
            if let Some(status) = decode(params, "status", sub) {
                cb.on_bluetooth_status(status);
            }
        })
    };
    set = {
        let cb = Arc::clone(&callback);
        set.on(EventName::ActionBluetoothStatusProgress, move |params, sub| {
            if let Some(percent) = decode(params, "percent", sub) {
                cb.on_bluetooth_status_progress(percent);
            }
        })
    };
    set = {
        let (cb, progress) = (Arc::clone(&callback), Arc::clone(&progress));
        set.on(EventName::ActionBluetoothSuccess, move |_, sub| {
            cb.on_bluetooth_success();
            finish(&progress, Channel::Bluetooth, sub);
        })
    };
    set.on(EventName::ActionBluetoothError, move |params, sub| {
        callback.on_bluetooth_error(&decode_error(params, sub));
        finish(&progress, Channel::Bluetooth, sub);
    })
}
