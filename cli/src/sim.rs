//! Simulated capability provider.
//!
//! Every long-running operation runs as a spawned task that walks through a
//! scripted sequence of sink calls with a fixed delay between steps. Canceling
//! aborts the task, which drops its sinks.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use latchkey_bridge::{
    ActionRequest, ActionSinks, BluetoothSink, CancelHandle, CapabilityProvider, CardHandle,
    CardScanSink, InternetSink, ProviderError, ProviderFut, ScanSink, SyncSink,
};
use latchkey_types::{
    ActionBluetoothStatus, ActionInternetStatus, CardUid, ErrorCode, Gadget, GadgetAction,
    Hardware, SyncStatus,
};
use tokio::time::sleep;

const DEMO_SESSION: &str = "ses_demo";

fn catalog() -> Vec<Hardware> {
    [
        ("hw_front", "Front door reader", "prod_r2"),
        ("hw_garage", "Garage controller", "prod_c1"),
        ("hw_locker", "Locker bank", "prod_l4"),
    ]
    .into_iter()
    .map(|(id, name, product)| Hardware {
        id: id.into(),
        name: name.into(),
        product_id: product.into(),
        revision_id: "rev_1".into(),
        sessions: vec![DEMO_SESSION.into()],
    })
    .collect()
}

fn gadgets() -> Vec<Gadget> {
    let action = |id: &str, name: &str| GadgetAction {
        id: id.into(),
        name: name.into(),
    };
    vec![
        Gadget {
            id: "gad_front".into(),
            name: "Front door".into(),
            actions: vec![action("open", "Open")],
        },
        Gadget {
            id: "gad_garage".into(),
            name: "Garage".into(),
            actions: vec![action("open", "Open"), action("close", "Close")],
        },
    ]
}

pub struct SimProvider {
    step: Duration,
    sessions: Mutex<Vec<String>>,
}

impl SimProvider {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            sessions: Mutex::new(vec![DEMO_SESSION.to_string()]),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Vec<String>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_session(&self, id: &str) -> bool {
        self.sessions().iter().any(|s| s == id)
    }

    /// Run `task` until it finishes or the returned handle is invoked.
    fn spawn(task: impl Future<Output = ()> + Send + 'static) -> CancelHandle {
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        tokio::spawn(async move {
            let _ = Abortable::new(task, abort_registration).await;
        });
        CancelHandle::new(move || abort_handle.abort())
    }
}

impl CapabilityProvider for SimProvider {
    fn scan(&self, sink: ScanSink) -> CancelHandle {
        let step = self.step;
        Self::spawn(async move {
            let found = catalog();
            for hardware in &found {
                sleep(step).await;
                sink.discover(hardware);
            }
            // Advertisements repeat; duplicates are reported as seen.
            sleep(step).await;
            sink.discover(&found[0]);
            sleep(step).await;
            sink.success();
        })
    }

    fn sync(&self, session_id: &str, hardware_id: &str, sink: SyncSink) -> CancelHandle {
        let step = self.step;
        let known_session = self.has_session(session_id);
        let known_hardware = catalog().iter().any(|hw| hw.id == hardware_id);
        Self::spawn(async move {
            if !known_session {
                sink.error(ProviderError::new(
                    ErrorCode::InvalidSession,
                    "session not found",
                ));
                return;
            }
            sink.status(SyncStatus::Scanning);
            sleep(step).await;
            if !known_hardware {
                sink.error(ProviderError::new(
                    ErrorCode::BluetoothDeviceNotFound,
                    "hardware not in range",
                ));
                return;
            }
            sink.status(SyncStatus::Connecting);
            sleep(step).await;
            sink.status(SyncStatus::SyncingDevice);
            for percent in [0.0, 25.0, 50.0, 75.0, 100.0] {
                sink.progress(percent);
                sleep(step).await;
            }
            sink.status(SyncStatus::SyncingServer);
            sleep(step).await;
            sink.success();
        })
    }

    fn action(&self, request: &ActionRequest, sinks: ActionSinks) -> CancelHandle {
        let step = self.step;
        let known_session = self.has_session(&request.session_id);
        let known_gadget = gadgets().iter().any(|gadget| {
            gadget.id == request.gadget_id && gadget.actions.iter().any(|a| a.id == request.action_id)
        });
        Self::spawn(async move {
            let ActionSinks {
                global,
                internet,
                bluetooth,
            } = sinks;
            if !known_session {
                global.error(ProviderError::new(
                    ErrorCode::InvalidSession,
                    "session not found",
                ));
                return;
            }
            if !known_gadget {
                global.error(ProviderError::new(
                    ErrorCode::InvalidParam,
                    "unknown gadget or action",
                ));
                return;
            }

            let (via_internet, via_bluetooth) = tokio::join!(
                run_internet(step, internet),
                run_bluetooth(step, bluetooth)
            );
            if via_internet || via_bluetooth {
                global.success();
            } else {
                global.error(ProviderError::new(
                    ErrorCode::AllCommMethodsFailed,
                    "no communication method succeeded",
                ));
            }
        })
    }

    fn scan_card(&self, sink: CardScanSink) -> CancelHandle {
        let step = self.step;
        Self::spawn(async move {
            sleep(step * 4).await;
            sink.success(Box::new(SimCard {
                uid: CardUid::new(vec![0x04, 0xa2, 0x1b, 0x7c]),
                step,
            }));
        })
    }

    fn session_ids(&self) -> ProviderFut<'_, Vec<String>> {
        Box::pin(async move { Ok(self.sessions().clone()) })
    }

    fn add_session<'a>(&'a self, token: &'a str) -> ProviderFut<'a, String> {
        Box::pin(async move {
            if token.trim().is_empty() {
                return Err(ProviderError::new(ErrorCode::InvalidParam, "empty session token").into());
            }
            let mut sessions = self.sessions();
            let id = format!("ses_{}", sessions.len() + 1);
            sessions.push(id.clone());
            Ok(id)
        })
    }

    fn remove_session<'a>(&'a self, id: &'a str) -> ProviderFut<'a, ()> {
        Box::pin(async move {
            self.sessions().retain(|s| s != id);
            Ok(())
        })
    }

    fn remove_all_sessions(&self) -> ProviderFut<'_, ()> {
        Box::pin(async move {
            self.sessions().clear();
            Ok(())
        })
    }

    fn refresh_session<'a>(&'a self, id: &'a str) -> ProviderFut<'a, ()> {
        Box::pin(async move {
            sleep(self.step).await;
            if self.has_session(id) {
                Ok(())
            } else {
                Err(ProviderError::new(ErrorCode::InvalidSession, "session not found").into())
            }
        })
    }

    fn refresh_all_sessions(&self) -> ProviderFut<'_, ()> {
        Box::pin(async move {
            sleep(self.step).await;
            Ok(())
        })
    }

    fn gadgets<'a>(&'a self, session_id: &'a str) -> ProviderFut<'a, Vec<Gadget>> {
        Box::pin(async move {
            if self.has_session(session_id) {
                Ok(gadgets())
            } else {
                Err(ProviderError::new(ErrorCode::InvalidSession, "session not found").into())
            }
        })
    }

    fn hardwares<'a>(&'a self, session_id: &'a str) -> ProviderFut<'a, Vec<Hardware>> {
        Box::pin(async move {
            if self.has_session(session_id) {
                Ok(catalog())
            } else {
                Err(ProviderError::new(ErrorCode::InvalidSession, "session not found").into())
            }
        })
    }

    fn is_bluetooth_supported(&self) -> bool {
        true
    }

    fn is_card_emulation_supported(&self) -> ProviderFut<'_, bool> {
        Box::pin(async { Ok(false) })
    }

    fn start_card_emulation(&self) -> ProviderFut<'_, ()> {
        Box::pin(async {
            Err(ProviderError::new(ErrorCode::Internal, "card emulation is not available").into())
        })
    }

    fn version(&self) -> String {
        concat!("sim-", env!("CARGO_PKG_VERSION")).to_string()
    }
}

async fn run_internet(step: Duration, sink: Option<InternetSink>) -> bool {
    let Some(sink) = sink else {
        return false;
    };
    sink.status(ActionInternetStatus::AcquiringLocation);
    sleep(step).await;
    sink.status(ActionInternetStatus::ExecutingAction);
    sleep(step * 2).await;
    sink.success();
    true
}

async fn run_bluetooth(step: Duration, sink: Option<BluetoothSink>) -> bool {
    let Some(sink) = sink else {
        return false;
    };
    sink.status(ActionBluetoothStatus::Scanning);
    sleep(step).await;
    sink.status(ActionBluetoothStatus::Connecting);
    sleep(step).await;
    sink.status(ActionBluetoothStatus::SyncingDevice);
    for percent in [0.0, 50.0, 100.0] {
        sink.progress(percent);
        sleep(step).await;
    }
    sink.status(ActionBluetoothStatus::ExecutingAction);
    sleep(step).await;
    sink.success();
    true
}

struct SimCard {
    uid: CardUid,
    step: Duration,
}

impl CardHandle for SimCard {
    fn uid(&self) -> &CardUid {
        &self.uid
    }

    fn is_akiles_card(&self) -> bool {
        true
    }

    fn update(&self) -> ProviderFut<'_, ()> {
        Box::pin(async move {
            sleep(self.step * 2).await;
            tracing::debug!(card_uid = %self.uid, "simulated card updated");
            Ok(())
        })
    }

    fn close(&self) {
        tracing::debug!(card_uid = %self.uid, "simulated card closed");
    }
}
