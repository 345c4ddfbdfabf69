//! Multi-channel action driver

use std::sync::Arc;

use latchkey_bridge::{ActionSink, BluetoothSink, Channel, InternetSink, ProviderError};
use latchkey_types::{ActionBluetoothStatus, ActionInternetStatus, ActionOptions, ErrorCode};

use crate::common::{Harness, Recorder};

struct Paths {
    global: Option<ActionSink>,
    internet: Option<InternetSink>,
    bluetooth: Option<BluetoothSink>,
}

impl Paths {
    fn take(h: &Harness) -> Self {
        let (_, sinks) = h.provider().take_action();
        Self {
            global: Some(sinks.global),
            internet: sinks.internet,
            bluetooth: sinks.bluetooth,
        }
    }

    fn succeed(&mut self, channel: Channel) {
        match channel {
            Channel::Global => self.global.take().unwrap().success(),
            Channel::Internet => self.internet.take().unwrap().success(),
            Channel::Bluetooth => self.bluetooth.take().unwrap().success(),
        }
    }
}

const ORDERS: [[Channel; 3]; 6] = [
    [Channel::Global, Channel::Internet, Channel::Bluetooth],
    [Channel::Global, Channel::Bluetooth, Channel::Internet],
    [Channel::Internet, Channel::Global, Channel::Bluetooth],
    [Channel::Internet, Channel::Bluetooth, Channel::Global],
    [Channel::Bluetooth, Channel::Global, Channel::Internet],
    [Channel::Bluetooth, Channel::Internet, Channel::Global],
];

#[test]
fn retires_only_after_all_three_channels_in_every_order() {
    for order in ORDERS {
        let mut h = Harness::new();
        let rec = Recorder::new();
        let pending =
            h.client
                .action("ses_1", "gad_1", "open", ActionOptions::default(), rec.clone());
        let id = pending.op_id().clone();
        let mut paths = Paths::take(&h);

        for (step, channel) in order.iter().enumerate() {
            paths.succeed(*channel);
            h.pump();
            let last = step == order.len() - 1;
            assert_eq!(pending.is_listening(), !last, "{order:?} step {step}");
            assert_eq!(h.host.registry().is_active(&id), !last, "{order:?} step {step}");
        }

        assert_eq!(rec.count("success"), 1, "{order:?}");
        assert_eq!(rec.count("internet_success"), 1, "{order:?}");
        assert_eq!(rec.count("bluetooth_success"), 1, "{order:?}");
    }
}

#[tokio::test]
async fn path_events_keep_flowing_after_global_outcome() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h
        .client
        .action("ses_1", "gad_1", "open", ActionOptions::default(), rec.clone());
    let canceler = pending.canceler();
    let id = pending.op_id().clone();
    let (_, sinks) = h.provider().take_action();
    let internet = sinks.internet.unwrap();
    let bluetooth = sinks.bluetooth.unwrap();

    internet.status(ActionInternetStatus::ExecutingAction);
    bluetooth.status(ActionBluetoothStatus::Scanning);
    internet.success();
    sinks.global.success();
    h.pump();

    // The caller's future resolves on the global outcome alone.
    assert!(pending.wait().await.is_ok());
    assert!(h.client.bus().is_subscribed(&id));

    bluetooth.status(ActionBluetoothStatus::SyncingServer);
    bluetooth.progress(60.0);
    bluetooth.success();
    h.pump();

    assert_eq!(
        rec.calls(),
        vec![
            "internet_status:EXECUTING_ACTION",
            "bluetooth_status:SCANNING",
            "internet_success",
            "success",
            "bluetooth_status:SYNCING_SERVER",
            "bluetooth_progress:60",
            "bluetooth_success",
        ]
    );
    assert!(!h.client.bus().is_subscribed(&id));
    assert!(h.host.registry().is_empty());

    canceler.cancel();
    assert!(h.provider().canceled().is_empty());
}

#[tokio::test]
async fn disabled_internet_path_reports_canceled_once() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let options = ActionOptions::default().with_internet(false);
    let pending = h
        .client
        .action("ses_1", "gad_1", "open", options, rec.clone());

    let (request, sinks) = h.provider().take_action();
    assert!(!request.options.use_internet);
    assert!(sinks.internet.is_none());
    let bluetooth = sinks.bluetooth.unwrap();

    h.pump();
    assert_eq!(rec.calls(), vec!["internet_error:CANCELED"]);

    bluetooth.success();
    sinks.global.success();
    h.pump();

    assert_eq!(rec.count("internet_error:CANCELED"), 1);
    assert!(pending.wait().await.is_ok());
    assert!(h.client.bus().is_empty());
    assert!(h.host.registry().is_empty());
}

#[tokio::test]
async fn both_paths_disabled_still_completes_contract() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let options = ActionOptions::default()
        .with_internet(false)
        .with_bluetooth(false);
    let pending = h
        .client
        .action("ses_1", "gad_1", "open", options, rec.clone());

    let (_, sinks) = h.provider().take_action();
    assert!(sinks.internet.is_none() && sinks.bluetooth.is_none());
    sinks.global.error(ProviderError::new(
        ErrorCode::AllCommMethodsFailed,
        "no communication method enabled",
    ));
    h.pump();

    assert_eq!(
        rec.calls(),
        vec![
            "internet_error:CANCELED",
            "bluetooth_error:CANCELED",
            "error:ALL_COMM_METHODS_FAILED",
        ]
    );
    assert_eq!(
        pending.wait().await.unwrap_err().code(),
        ErrorCode::AllCommMethodsFailed
    );
    assert!(h.host.registry().is_empty());
}

#[test]
fn request_is_forwarded_to_provider() {
    let h = Harness::new();
    let options = ActionOptions::default().with_location_permission_request(false);
    let _pending = h
        .client
        .action("ses_9", "gad_7", "close", options, Arc::new(()));

    let (request, _sinks) = h.provider().take_action();
    assert_eq!(request.session_id, "ses_9");
    assert_eq!(request.gadget_id, "gad_7");
    assert_eq!(request.action_id, "close");
    assert_eq!(request.options, options);
}

#[test]
fn cancel_then_drop_ends_every_channel_with_canceled() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h
        .client
        .action("ses_1", "gad_1", "open", ActionOptions::default(), rec.clone());

    pending.cancel();
    drop(h.provider().take_action());
    h.pump();

    assert_eq!(rec.count("error:CANCELED"), 1);
    assert_eq!(rec.count("internet_error:CANCELED"), 1);
    assert_eq!(rec.count("bluetooth_error:CANCELED"), 1);
    assert!(!pending.is_listening());
    assert!(h.host.registry().is_empty());
}

#[test]
fn path_errors_do_not_end_the_action() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h
        .client
        .action("ses_1", "gad_1", "open", ActionOptions::default(), rec.clone());
    let (_, sinks) = h.provider().take_action();

    sinks.internet.unwrap().error(ProviderError::new(
        ErrorCode::InternetDeviceOffline,
        "device offline",
    ));
    sinks.bluetooth.unwrap().error(ProviderError::new(
        ErrorCode::BluetoothDeviceNotFound,
        "not in range",
    ));
    h.pump();

    assert!(pending.is_listening());
    assert_eq!(
        rec.calls(),
        vec![
            "internet_error:INTERNET_DEVICE_OFFLINE",
            "bluetooth_error:BLUETOOTH_DEVICE_NOT_FOUND",
        ]
    );

    sinks.global.error(ProviderError::new(
        ErrorCode::AllCommMethodsFailed,
        "all paths failed",
    ));
    h.pump();
    assert!(!pending.is_listening());
}

#[test]
fn concurrent_action_and_sync_stay_partitioned() {
    let mut h = Harness::new();
    let action_rec = Recorder::new();
    let sync_rec = Recorder::new();
    let _action = h.client.action(
        "ses_1",
        "gad_1",
        "open",
        ActionOptions::default(),
        action_rec.clone(),
    );
    let _sync = h.client.sync("ses_1", "hw_1", sync_rec.clone());

    let (_, sinks) = h.provider().take_action();
    let sync = h.provider().take_sync();
    let bluetooth = sinks.bluetooth.unwrap();

    bluetooth.progress(50.0);
    sync.progress(25.0);
    bluetooth.success();
    sync.success();
    h.pump();

    assert_eq!(action_rec.calls(), vec!["bluetooth_progress:50", "bluetooth_success"]);
    assert_eq!(sync_rec.calls(), vec!["progress:25", "success"]);
}
