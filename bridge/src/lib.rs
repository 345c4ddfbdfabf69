//! Asynchronous operation correlation across a fire-and-forget boundary.
//!
//! The native side ([`Host`]) exposes long-running calls that return an
//! [`OperationId`] immediately and report everything else as named events on
//! one shared stream. The consumer side ([`Client`]) routes those events back
//! to the caller that started each operation through the [`EventBus`], with
//! a [`Dispatcher`] pumping the stream in between.
//!
//! ```ignore
//! let Connection { client, dispatcher, .. } = connect(provider);
//! dispatcher.spawn();
//! let pending = client.scan(Arc::new(Printer));
//! pending.wait().await?;
//! ```

pub mod bus;
mod card;
pub mod client;
mod convert;
mod dispatch;
pub mod event;
pub mod host;
mod native;
mod progress;
mod provider;
mod registry;

use std::sync::Arc;

pub use bus::{EventBus, Handler, HandlerSet, Subscription};
pub use card::CardSessionHolder;
pub use client::{
    ActionCallback, Canceler, Card, Client, PendingOperation, ScanCallback, ScanCardCallback,
    SyncCallback,
};
pub use convert::{NativeFailure, ProviderError, convert_failure};
pub use dispatch::Dispatcher;
pub use event::{Event, EventEmitter, EventName, EventReceiver};
pub use host::Host;
pub use host::sink::{
    ActionSink, BluetoothSink, CardScanSink, InternetSink, ScanSink, SyncSink,
};
pub use latchkey_types::OperationId;
pub use native::{NativeFut, NativeModule};
pub use progress::{ActionProgress, Channel};
pub use provider::{ActionRequest, ActionSinks, CapabilityProvider, CardHandle, ProviderFut};
pub use registry::{CancelHandle, OperationRegistry};

/// Both ends of one boundary, wired together.
pub struct Connection<P> {
    pub host: Arc<Host<P>>,
    pub client: Client,
    pub dispatcher: Dispatcher,
}

/// Build a host around `provider` and a client listening to it.
pub fn connect<P: CapabilityProvider>(provider: P) -> Connection<P> {
    let (host, events) = Host::new(provider);
    let host = Arc::new(host);
    let bus = EventBus::new();
    let native = Arc::clone(&host) as Arc<dyn NativeModule>;
    Connection {
        client: Client::new(native, bus.clone()),
        dispatcher: Dispatcher::new(events, bus),
        host,
    }
}
