use std::sync::Arc;

use latchkey_types::{ErrorInfo, Hardware};

use super::{Outcome, decode, decode_error};
use crate::bus::HandlerSet;
use crate::event::EventName;

/// Observer for a discovery scan. Every method defaults to a no-op.
pub trait ScanCallback: Send + Sync {
    /// Called once per discovery. The same hardware may be reported more
    /// than once; deduplicate here if needed.
    fn on_discover(&self, _hardware: &Hardware) {}

    fn on_success(&self) {}

    fn on_error(&self, _error: &ErrorInfo) {}
}

impl ScanCallback for () {}

pub(super) fn handlers(callback: Arc<dyn ScanCallback>, outcome: Arc<Outcome<()>>) -> HandlerSet {
    let on_discover = Arc::clone(&callback);
    let on_success = Arc::clone(&callback);
    let success_outcome = Arc::clone(&outcome);

    HandlerSet::new()
        .on(EventName::ScanDiscover, move |params, sub| {
            if let Some(hardware) = decode::<Hardware>(params, "hardware", sub) {
                on_discover.on_discover(&hardware);
            }
        })
        .on(EventName::ScanSuccess, move |_, sub| {
            on_success.on_success();
            sub.unsubscribe();
            success_outcome.resolve(Ok(()));
        })
        .on(EventName::ScanError, move |params, sub| {
            let error = decode_error(params, sub);
            callback.on_error(&error);
            sub.unsubscribe();
            outcome.resolve(Err(error));
        })
}
