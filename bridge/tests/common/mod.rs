//! Shared test utilities and fixtures
//!
//! A provider that parks every sink it receives so tests can drive each
//! channel by hand, and a recorder that implements every callback trait.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use latchkey_bridge::{
    ActionCallback, ActionRequest, ActionSinks, CancelHandle, CapabilityProvider, Card,
    CardHandle, CardScanSink, Client, Connection, Dispatcher, Host, OperationId, ProviderError,
    ProviderFut, ScanCallback, ScanCardCallback, ScanSink, SyncCallback, SyncSink, connect,
};
use latchkey_types::{
    ActionBluetoothStatus, ActionInternetStatus, CardUid, ErrorCode, ErrorInfo, Gadget,
    GadgetAction, Hardware, SyncStatus,
};

#[derive(Default)]
pub struct FakeProvider {
    scans: Mutex<Vec<ScanSink>>,
    syncs: Mutex<Vec<SyncSink>>,
    actions: Mutex<Vec<(ActionRequest, ActionSinks)>>,
    card_scans: Mutex<Vec<CardScanSink>>,
    canceled: Arc<Mutex<Vec<OperationId>>>,
    sessions: Mutex<Vec<String>>,
    immediate_scans: AtomicBool,
}

impl FakeProvider {
    /// Finish every later scan before returning its cancel handle.
    pub fn complete_scans_immediately(&self) {
        self.immediate_scans.store(true, Ordering::SeqCst);
    }

    fn cancel_handle(&self, id: &OperationId) -> CancelHandle {
        let canceled = Arc::clone(&self.canceled);
        let id = id.clone();
        CancelHandle::new(move || canceled.lock().unwrap().push(id))
    }

    pub fn take_scan(&self) -> ScanSink {
        self.scans.lock().unwrap().pop().expect("no scan started")
    }

    pub fn take_sync(&self) -> SyncSink {
        self.syncs.lock().unwrap().pop().expect("no sync started")
    }

    pub fn take_action(&self) -> (ActionRequest, ActionSinks) {
        self.actions.lock().unwrap().pop().expect("no action started")
    }

    pub fn take_card_scan(&self) -> CardScanSink {
        self.card_scans
            .lock()
            .unwrap()
            .pop()
            .expect("no card scan started")
    }

    pub fn canceled(&self) -> Vec<OperationId> {
        self.canceled.lock().unwrap().clone()
    }
}

impl CapabilityProvider for FakeProvider {
    fn scan(&self, sink: ScanSink) -> CancelHandle {
        let handle = self.cancel_handle(sink.op_id());
        if self.immediate_scans.load(Ordering::SeqCst) {
            sink.success();
            return handle;
        }
        self.scans.lock().unwrap().push(sink);
        handle
    }

    fn sync(&self, _session_id: &str, _hardware_id: &str, sink: SyncSink) -> CancelHandle {
        let handle = self.cancel_handle(sink.op_id());
        self.syncs.lock().unwrap().push(sink);
        handle
    }

    fn action(&self, request: &ActionRequest, sinks: ActionSinks) -> CancelHandle {
        let handle = self.cancel_handle(sinks.global.op_id());
        self.actions.lock().unwrap().push((request.clone(), sinks));
        handle
    }

    fn scan_card(&self, sink: CardScanSink) -> CancelHandle {
        let handle = self.cancel_handle(sink.op_id());
        self.card_scans.lock().unwrap().push(sink);
        handle
    }

    fn session_ids(&self) -> ProviderFut<'_, Vec<String>> {
        Box::pin(async move { Ok(self.sessions.lock().unwrap().clone()) })
    }

    fn add_session<'a>(&'a self, token: &'a str) -> ProviderFut<'a, String> {
        Box::pin(async move {
            if token.is_empty() {
                return Err(ProviderError::new(ErrorCode::InvalidParam, "empty token").into());
            }
            let id = format!("ses_{}", token.len());
            self.sessions.lock().unwrap().push(id.clone());
            Ok(id)
        })
    }

    fn remove_session<'a>(&'a self, id: &'a str) -> ProviderFut<'a, ()> {
        Box::pin(async move {
            self.sessions.lock().unwrap().retain(|s| s != id);
            Ok(())
        })
    }

    fn remove_all_sessions(&self) -> ProviderFut<'_, ()> {
        Box::pin(async move {
            self.sessions.lock().unwrap().clear();
            Ok(())
        })
    }

    fn refresh_session<'a>(&'a self, id: &'a str) -> ProviderFut<'a, ()> {
        Box::pin(async move {
            if self.sessions.lock().unwrap().iter().any(|s| s == id) {
                Ok(())
            } else {
                Err(ProviderError::new(ErrorCode::InvalidSession, "unknown session").into())
            }
        })
    }

    fn refresh_all_sessions(&self) -> ProviderFut<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn gadgets<'a>(&'a self, _session_id: &'a str) -> ProviderFut<'a, Vec<Gadget>> {
        Box::pin(async {
            Ok(vec![Gadget {
                id: "gad_door".into(),
                name: "Door".into(),
                actions: vec![GadgetAction {
                    id: "open".into(),
                    name: "Open".into(),
                }],
            }])
        })
    }

    fn hardwares<'a>(&'a self, _session_id: &'a str) -> ProviderFut<'a, Vec<Hardware>> {
        Box::pin(async { Err(std::io::Error::other("backend unreachable").into()) })
    }

    fn is_bluetooth_supported(&self) -> bool {
        true
    }

    fn is_card_emulation_supported(&self) -> ProviderFut<'_, bool> {
        Box::pin(async { Ok(false) })
    }

    fn start_card_emulation(&self) -> ProviderFut<'_, ()> {
        Box::pin(async {
            Err(ProviderError::new(ErrorCode::InvalidParam, "card emulation not needed").into())
        })
    }

    fn version(&self) -> String {
        "test".into()
    }
}

pub struct FakeCard {
    uid: CardUid,
    pub updates: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeCard {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            uid: CardUid::new(bytes.to_vec()),
            updates: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CardHandle for FakeCard {
    fn uid(&self) -> &CardUid {
        &self.uid
    }

    fn is_akiles_card(&self) -> bool {
        true
    }

    fn update(&self) -> ProviderFut<'_, ()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub host: Arc<Host<FakeProvider>>,
    pub client: Client,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new() -> Self {
        let Connection {
            host,
            client,
            dispatcher,
        } = connect(FakeProvider::default());
        Self {
            host,
            client,
            dispatcher,
        }
    }

    pub fn provider(&self) -> &FakeProvider {
        self.host.provider()
    }

    /// Deliver everything emitted so far.
    pub fn pump(&mut self) -> usize {
        self.dispatcher.poll_events(usize::MAX)
    }
}

pub fn hardware(id: &str) -> Hardware {
    Hardware {
        id: id.into(),
        name: format!("Hardware {id}"),
        product_id: "prod".into(),
        revision_id: "rev".into(),
        sessions: vec!["ses_1".into()],
    }
}

/// Records every callback as a short string, in order.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

impl ScanCallback for Recorder {
    fn on_discover(&self, hardware: &Hardware) {
        self.push(format!("discover:{}", hardware.id));
    }

    fn on_success(&self) {
        self.push("success");
    }

    fn on_error(&self, error: &ErrorInfo) {
        self.push(format!("error:{}", error.code()));
    }
}

impl SyncCallback for Recorder {
    fn on_status(&self, status: SyncStatus) {
        self.push(format!("status:{status}"));
    }

    fn on_status_progress(&self, percent: f64) {
        self.push(format!("progress:{percent}"));
    }

    fn on_success(&self) {
        self.push("success");
    }

    fn on_error(&self, error: &ErrorInfo) {
        self.push(format!("error:{}", error.code()));
    }
}

impl ActionCallback for Recorder {
    fn on_success(&self) {
        self.push("success");
    }

    fn on_error(&self, error: &ErrorInfo) {
        self.push(format!("error:{}", error.code()));
    }

    fn on_internet_status(&self, status: ActionInternetStatus) {
        self.push(format!("internet_status:{status}"));
    }

    fn on_internet_success(&self) {
        self.push("internet_success");
    }

    fn on_internet_error(&self, error: &ErrorInfo) {
        self.push(format!("internet_error:{}", error.code()));
    }

    fn on_bluetooth_status(&self, status: ActionBluetoothStatus) {
        self.push(format!("bluetooth_status:{status}"));
    }

    fn on_bluetooth_status_progress(&self, percent: f64) {
        self.push(format!("bluetooth_progress:{percent}"));
    }

    fn on_bluetooth_success(&self) {
        self.push("bluetooth_success");
    }

    fn on_bluetooth_error(&self, error: &ErrorInfo) {
        self.push(format!("bluetooth_error:{}", error.code()));
    }
}

impl ScanCardCallback for Recorder {
    fn on_success(&self, card: &Card) {
        self.push(format!("card:{}", card.uid()));
    }

    fn on_error(&self, error: &ErrorInfo) {
        self.push(format!("error:{}", error.code()));
    }
}
