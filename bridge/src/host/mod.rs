//! Native side of the boundary.
//!
//! `Host` owns the provider, the operation registry, the card session and the
//! sending half of the event stream. Every long-running call follows the same
//! sequence: reserve an identity, hand the provider sinks bound to it, then
//! track the cancel handle the provider returned.

pub mod sink;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use latchkey_types::{ActionOptions, ErrorInfo, Gadget, Hardware, OperationId};
use tokio::task::JoinHandle;

use crate::card::CardSessionHolder;
use crate::convert::convert_failure;
use crate::event::{EventEmitter, EventName, EventReceiver};
use crate::native::{NativeFut, NativeModule};
use crate::progress::{ActionProgress, Channel};
use crate::provider::{ActionRequest, ActionSinks, CapabilityProvider};
use crate::registry::{CancelHandle, OperationRegistry};
use sink::{
    ActionSink, BluetoothSink, CardScanSink, Completion, Expiry, InternetSink, ScanSink,
    SinkCore, SyncSink,
};

/// Never sweep more often than this, however short the stale timeout.
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(100);

pub struct Host<P> {
    provider: P,
    registry: Arc<OperationRegistry>,
    cards: Arc<CardSessionHolder>,
    emitter: EventEmitter,
}

impl<P: CapabilityProvider> Host<P> {
    /// Returns the host and the receiving half of its event stream.
    pub fn new(provider: P) -> (Self, EventReceiver) {
        let (emitter, events) = EventEmitter::channel();
        let host = Self {
            provider,
            registry: Arc::new(OperationRegistry::new()),
            cards: Arc::new(CardSessionHolder::new()),
            emitter,
        };
        (host, events)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn cards(&self) -> &CardSessionHolder {
        &self.cards
    }

    /// End operations in flight for longer than `max_age`.
    ///
    /// Every channel that has not reported gets a `TIMEOUT` terminal, then the
    /// provider's cancel handle runs.
    pub fn reap_stale(&self, max_age: Duration) -> Vec<OperationId> {
        let reaped = self.registry.reap_older_than(max_age);
        if !reaped.is_empty() {
            tracing::warn!(count = reaped.len(), "reaped stale operations");
        }
        reaped
    }

    /// Periodically reap stale operations until the host is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, max_age: Duration) -> JoinHandle<()> {
        let host = Arc::downgrade(self);
        let period = (max_age / 2).max(MIN_REAP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(host) = host.upgrade() else {
                    break;
                };
                host.reap_stale(max_age);
            }
        })
    }

    fn start<F>(&self, kind: &'static str, start: F) -> OperationId
    where
        F: FnOnce(&mut Launch) -> CancelHandle,
    {
        let id = self.registry.begin();
        let mut launch = Launch {
            id: id.clone(),
            canceled: Arc::new(AtomicBool::new(false)),
            expiry: Expiry::default(),
        };
        tracing::debug!(op_id = %id, kind, "starting operation");
        let handle = start(&mut launch);
        let Launch {
            canceled, expiry, ..
        } = launch;
        self.registry.track_with_reap(
            &id,
            CancelHandle::new(move || {
                canceled.store(true, Ordering::SeqCst);
                handle.invoke();
            }),
            CancelHandle::new(move || expiry.expire()),
        );
        id
    }

    fn core(&self, launch: &mut Launch, completion: Completion, error_event: EventName) -> SinkCore {
        let core = SinkCore::new(
            launch.id.clone(),
            self.emitter.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&launch.canceled),
            completion,
            error_event,
        );
        launch.expiry.watch(&core);
        core
    }
}

/// Per-operation state gathered while the provider is being started.
struct Launch {
    id: OperationId,
    canceled: Arc<AtomicBool>,
    expiry: Expiry,
}

impl<P: CapabilityProvider> NativeModule for Host<P> {
    fn scan(&self) -> OperationId {
        self.start("scan", |launch| {
            let sink = ScanSink::new(self.core(launch, Completion::Single, EventName::ScanError));
            self.provider.scan(sink)
        })
    }

    fn sync(&self, session_id: &str, hardware_id: &str) -> OperationId {
        self.start("sync", |launch| {
            let sink = SyncSink::new(self.core(launch, Completion::Single, EventName::SyncError));
            self.provider.sync(session_id, hardware_id, sink)
        })
    }

    fn action(
        &self,
        session_id: &str,
        gadget_id: &str,
        action_id: &str,
        options: ActionOptions,
    ) -> OperationId {
        let request = ActionRequest {
            session_id: session_id.to_string(),
            gadget_id: gadget_id.to_string(),
            action_id: action_id.to_string(),
            options,
        };
        self.start("action", |launch| {
            let progress = Arc::new(Mutex::new(ActionProgress::new()));
            let mut core = |channel, error_event| {
                let completion = Completion::Action {
                    progress: Arc::clone(&progress),
                    channel,
                };
                self.core(launch, completion, error_event)
            };

            let global = ActionSink::new(core(Channel::Global, EventName::ActionError));
            let internet = InternetSink::new(core(Channel::Internet, EventName::ActionInternetError));
            let bluetooth =
                BluetoothSink::new(core(Channel::Bluetooth, EventName::ActionBluetoothError));

            let internet = if options.use_internet {
                Some(internet)
            } else {
                internet.error(ErrorInfo::canceled("internet path disabled by options"));
                None
            };
            let bluetooth = if options.use_bluetooth {
                Some(bluetooth)
            } else {
                bluetooth.error(ErrorInfo::canceled("bluetooth path disabled by options"));
                None
            };

            self.provider.action(
                &request,
                ActionSinks {
                    global,
                    internet,
                    bluetooth,
                },
            )
        })
    }

    fn scan_card(&self) -> OperationId {
        self.start("scan_card", |launch| {
            let core = self.core(launch, Completion::Single, EventName::ScanCardError);
            self.provider
                .scan_card(CardScanSink::new(core, Arc::clone(&self.cards)))
        })
    }

    fn cancel(&self, id: &OperationId) {
        self.registry.cancel(id);
    }

    fn update_card<'a>(&'a self, uid: &'a str) -> NativeFut<'a, ()> {
        Box::pin(async move {
            let card = self.cards.matching(uid)?;
            card.update().await.map_err(convert_failure)
        })
    }

    fn close_card(&self, uid: &str) {
        self.cards.close(uid);
    }

    fn session_ids(&self) -> NativeFut<'_, Vec<String>> {
        Box::pin(async move { self.provider.session_ids().await.map_err(convert_failure) })
    }

    fn add_session<'a>(&'a self, token: &'a str) -> NativeFut<'a, String> {
        Box::pin(async move {
            self.provider
                .add_session(token)
                .await
                .map_err(convert_failure)
        })
    }

    fn remove_session<'a>(&'a self, id: &'a str) -> NativeFut<'a, ()> {
        Box::pin(async move {
            self.provider
                .remove_session(id)
                .await
                .map_err(convert_failure)
        })
    }

    fn remove_all_sessions(&self) -> NativeFut<'_, ()> {
        Box::pin(async move {
            self.provider
                .remove_all_sessions()
                .await
                .map_err(convert_failure)
        })
    }

    fn refresh_session<'a>(&'a self, id: &'a str) -> NativeFut<'a, ()> {
        Box::pin(async move {
            self.provider
                .refresh_session(id)
                .await
                .map_err(convert_failure)
        })
    }

    fn refresh_all_sessions(&self) -> NativeFut<'_, ()> {
        Box::pin(async move {
            self.provider
                .refresh_all_sessions()
                .await
                .map_err(convert_failure)
        })
    }

    fn gadgets<'a>(&'a self, session_id: &'a str) -> NativeFut<'a, Vec<Gadget>> {
        Box::pin(async move {
            self.provider
                .gadgets(session_id)
                .await
                .map_err(convert_failure)
        })
    }

    fn hardwares<'a>(&'a self, session_id: &'a str) -> NativeFut<'a, Vec<Hardware>> {
        Box::pin(async move {
            self.provider
                .hardwares(session_id)
                .await
                .map_err(convert_failure)
        })
    }

    fn is_bluetooth_supported(&self) -> bool {
        self.provider.is_bluetooth_supported()
    }

    fn is_card_emulation_supported(&self) -> NativeFut<'_, bool> {
        Box::pin(async move {
            self.provider
                .is_card_emulation_supported()
                .await
                .map_err(convert_failure)
        })
    }

    fn start_card_emulation(&self) -> NativeFut<'_, ()> {
        Box::pin(async move {
            self.provider
                .start_card_emulation()
                .await
                .map_err(convert_failure)
        })
    }

    fn version(&self) -> String {
        self.provider.version()
    }
}
