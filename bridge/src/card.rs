//! The one currently scanned card.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use latchkey_types::{CardUid, ErrorInfo};

use crate::provider::CardHandle;

#[derive(Default)]
pub struct CardSessionHolder {
    held: Mutex<Option<Arc<dyn CardHandle>>>,
}

impl CardSessionHolder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, Option<Arc<dyn CardHandle>>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces any held card. The superseded card is not closed.
    pub fn on_scan_success(&self, card: Box<dyn CardHandle>) {
        let uid = card.uid().clone();
        *self.held() = Some(Arc::from(card));
        tracing::debug!(card_uid = %uid, "card session started");
    }

    /// The held card, if its UID matches `uid` case-insensitively.
    pub fn matching(&self, uid: &str) -> Result<Arc<dyn CardHandle>, ErrorInfo> {
        let held = self.held();
        let Some(card) = held.as_ref() else {
            return Err(ErrorInfo::internal("No card has been scanned yet"));
        };
        if card.uid().matches(uid) {
            Ok(Arc::clone(card))
        } else {
            Err(ErrorInfo::internal(format!(
                "Card with UID {uid} does not match last scanned card ({})",
                card.uid()
            )))
        }
    }

    /// Closes and clears the held card on match; otherwise does nothing.
    pub fn close(&self, uid: &str) {
        let taken = {
            let mut held = self.held();
            if held.as_ref().is_some_and(|card| card.uid().matches(uid)) {
                held.take()
            } else {
                None
            }
        };
        match taken {
            Some(card) => {
                card.close();
                tracing::debug!(card_uid = %card.uid(), "card session closed");
            }
            None => tracing::trace!(card_uid = uid, "close for non-matching card ignored"),
        }
    }

    #[must_use]
    pub fn held_uid(&self) -> Option<CardUid> {
        self.held().as_ref().map(|card| card.uid().clone())
    }
}
