//! The native capability layer, seen from the host.
//!
//! Long-running calls receive channel sinks and return a [`CancelHandle`]
//! immediately; the provider reports progress through the sinks from its own
//! threads or tasks. Each sink's terminal methods consume it, and a sink
//! dropped without one reports a terminal error itself.

use std::future::Future;
use std::pin::Pin;

use latchkey_types::{ActionOptions, CardUid, Gadget, Hardware};

use crate::convert::NativeFailure;
use crate::host::sink::{
    ActionSink, BluetoothSink, CardScanSink, InternetSink, ScanSink, SyncSink,
};
use crate::registry::CancelHandle;

pub type ProviderFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, NativeFailure>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub session_id: String,
    pub gadget_id: String,
    pub action_id: String,
    pub options: ActionOptions,
}

/// Sinks for one `action`. A path disabled by the options is `None`; its
/// `CANCELED` terminal has already been reported.
pub struct ActionSinks {
    pub global: ActionSink,
    pub internet: Option<InternetSink>,
    pub bluetooth: Option<BluetoothSink>,
}

/// A scanned contactless card.
pub trait CardHandle: Send + Sync {
    fn uid(&self) -> &CardUid;

    fn is_akiles_card(&self) -> bool;

    /// Refresh the card's on-chip data.
    fn update(&self) -> ProviderFut<'_, ()>;

    fn close(&self);
}

pub trait CapabilityProvider: Send + Sync + 'static {
    fn scan(&self, sink: ScanSink) -> CancelHandle;

    fn sync(&self, session_id: &str, hardware_id: &str, sink: SyncSink) -> CancelHandle;

    fn action(&self, request: &ActionRequest, sinks: ActionSinks) -> CancelHandle;

    fn scan_card(&self, sink: CardScanSink) -> CancelHandle;

    fn session_ids(&self) -> ProviderFut<'_, Vec<String>>;

    /// Returns the new session's ID.
    fn add_session<'a>(&'a self, token: &'a str) -> ProviderFut<'a, String>;

    fn remove_session<'a>(&'a self, id: &'a str) -> ProviderFut<'a, ()>;

    fn remove_all_sessions(&self) -> ProviderFut<'_, ()>;

    fn refresh_session<'a>(&'a self, id: &'a str) -> ProviderFut<'a, ()>;

    fn refresh_all_sessions(&self) -> ProviderFut<'_, ()>;

    fn gadgets<'a>(&'a self, session_id: &'a str) -> ProviderFut<'a, Vec<Gadget>>;

    fn hardwares<'a>(&'a self, session_id: &'a str) -> ProviderFut<'a, Vec<Hardware>>;

    fn is_bluetooth_supported(&self) -> bool;

    /// May need to ask the device, so it resolves asynchronously.
    fn is_card_emulation_supported(&self) -> ProviderFut<'_, bool>;

    fn start_card_emulation(&self) -> ProviderFut<'_, ()>;

    fn version(&self) -> String;
}
