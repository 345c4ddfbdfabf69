use std::sync::Arc;

use latchkey_types::{ErrorInfo, SyncStatus};

use super::{Outcome, decode, decode_error};
use crate::bus::HandlerSet;
use crate::event::EventName;

/// Observer for a hardware sync. Every method defaults to a no-op.
pub trait SyncCallback: Send + Sync {
    fn on_status(&self, _status: SyncStatus) {}

    /// Percentage in `0.0..=100.0`. Not guaranteed to be monotonic.
    fn on_status_progress(&self, _percent: f64) {}

    fn on_success(&self) {}

    fn on_error(&self, _error: &ErrorInfo) {}
}

impl SyncCallback for () {}

pub(super) fn handlers(callback: Arc<dyn SyncCallback>, outcome: Arc<Outcome<()>>) -> HandlerSet {
    let on_status = Arc::clone(&callback);
    let on_progress = Arc::clone(&callback);
    let on_success = Arc::clone(&callback);
    let success_outcome = Arc::clone(&outcome);

    HandlerSet::new()
        .on(EventName::SyncStatus, move |params, sub| {
            if let Some(status) = decode(params, "status", sub) {
                on_status.on_status(status);
            }
        })
        .on(EventName::SyncStatusProgress, move |params, sub| {
            if let Some(percent) = decode(params, "percent", sub) {
                on_progress.on_status_progress(percent);
            }
        })
        .on(EventName::SyncSuccess, move |_, sub| {
            on_success.on_success();
            sub.unsubscribe();
            success_outcome.resolve(Ok(()));
        })
        .on(EventName::SyncError, move |params, sub| {
            let error = decode_error(params, sub);
            callback.on_error(&error);
            sub.unsubscribe();
            outcome.resolve(Err(error));
        })
}
