use std::fmt;
use std::sync::Arc;

use latchkey_types::{CardInfo, ErrorInfo};

use super::{Outcome, decode_error};
use crate::bus::HandlerSet;
use crate::event::{EventName, field};
use crate::native::NativeModule;

/// A scanned card, as seen by the client.
///
/// Calls are addressed by UID; the host rejects them once another card has
/// been scanned.
#[derive(Clone)]
pub struct Card {
    uid: String,
    is_akiles_card: bool,
    native: Arc<dyn NativeModule>,
}

impl Card {
    /// Uppercase hex, no separators.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn is_akiles_card(&self) -> bool {
        self.is_akiles_card
    }

    pub async fn update(&self) -> Result<(), ErrorInfo> {
        self.native.update_card(&self.uid).await
    }

    pub fn close(&self) {
        self.native.close_card(&self.uid);
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("uid", &self.uid)
            .field("is_akiles_card", &self.is_akiles_card)
            .finish_non_exhaustive()
    }
}

/// Observer for a card scan. Every method defaults to a no-op.
pub trait ScanCardCallback: Send + Sync {
    fn on_success(&self, _card: &Card) {}

    fn on_error(&self, _error: &ErrorInfo) {}
}

impl ScanCardCallback for () {}

pub(super) fn handlers(
    callback: Arc<dyn ScanCardCallback>,
    native: Arc<dyn NativeModule>,
    outcome: Arc<Outcome<Card>>,
) -> HandlerSet {
    let on_success = Arc::clone(&callback);
    let success_outcome = Arc::clone(&outcome);

    HandlerSet::new()
        .on(EventName::ScanCardSuccess, move |params, sub| {
            sub.unsubscribe();
            match field::<CardInfo>(params, "card") {
                Ok(info) => {
                    let card = Card {
                        uid: info.uid,
                        is_akiles_card: info.is_akiles_card,
                        native: Arc::clone(&native),
                    };
                    on_success.on_success(&card);
                    success_outcome.resolve(Ok(card));
                }
                Err(err) => {
                    tracing::warn!(op_id = %sub.op_id(), %err, "malformed card payload");
                    let error = ErrorInfo::internal(format!("malformed card payload: {err}"));
                    on_success.on_error(&error);
                    success_outcome.resolve(Err(error));
                }
            }
        })
        .on(EventName::ScanCardError, move |params, sub| {
            let error = decode_error(params, sub);
            callback.on_error(&error);
            sub.unsubscribe();
            outcome.resolve(Err(error));
        })
}
