//! Registry lifecycle, reaping and the spawned dispatcher

use std::sync::Arc;
use std::time::Duration;

use latchkey_bridge::connect;
use latchkey_types::{ActionOptions, ErrorCode};

use crate::common::{FakeProvider, Harness, Recorder};

#[tokio::test]
async fn completion_before_tracking_leaves_registry_empty() {
    let mut h = Harness::new();
    h.provider().complete_scans_immediately();
    let rec = Recorder::new();
    let pending = h.client.scan(rec.clone());

    assert!(!h.host.registry().is_active(pending.op_id()));
    assert!(h.host.registry().is_empty());
    h.pump();

    assert_eq!(rec.calls(), vec!["success"]);
    assert!(pending.wait().await.is_ok());
}

#[tokio::test]
async fn reaping_ends_a_silent_operation() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h.client.sync("ses_1", "hw_1", rec.clone());
    let id = pending.op_id().clone();
    // The provider keeps the sink and never reports.
    let sink = h.provider().take_sync();

    assert_eq!(h.host.reap_stale(Duration::from_secs(3600)), Vec::new());
    assert_eq!(h.host.reap_stale(Duration::ZERO), vec![id.clone()]);
    assert_eq!(h.provider().canceled(), vec![id.clone()]);
    assert!(h.host.registry().is_empty());
    h.pump();

    assert_eq!(rec.calls(), vec!["error:TIMEOUT"]);
    assert!(!pending.is_listening());
    assert!(!h.client.bus().is_subscribed(&id));
    assert_eq!(pending.wait().await.unwrap_err().code(), ErrorCode::Timeout);

    // A late report from the provider is swallowed.
    sink.success();
    h.pump();
    assert_eq!(rec.calls(), vec!["error:TIMEOUT"]);
}

#[tokio::test]
async fn reaping_ends_only_unfinished_action_channels() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h
        .client
        .action("ses_1", "gad_1", "open", ActionOptions::default(), rec.clone());
    let (_, sinks) = h.provider().take_action();
    sinks.internet.unwrap().success();
    h.pump();

    h.host.reap_stale(Duration::ZERO);
    h.pump();

    assert_eq!(rec.count("internet_success"), 1);
    assert_eq!(rec.count("internet_error:TIMEOUT"), 0);
    assert_eq!(rec.count("error:TIMEOUT"), 1);
    assert_eq!(rec.count("bluetooth_error:TIMEOUT"), 1);
    assert!(!pending.is_listening());
    assert!(h.client.bus().is_empty());

    // The provider drops what it still held after being canceled.
    drop(sinks.global);
    drop(sinks.bluetooth);
    h.pump();
    assert_eq!(rec.calls().len(), 3);
    assert_eq!(
        pending.wait().await.unwrap_err().code(),
        ErrorCode::Timeout
    );
}

#[tokio::test]
async fn spawned_reaper_sweeps_stale_operations() {
    let h = Harness::new();
    let pending = h.client.scan(Arc::new(()));
    let reaper = h.host.spawn_reaper(Duration::from_millis(10));

    let mut swept = false;
    for _ in 0..50 {
        if !h.host.registry().is_active(pending.op_id()) {
            swept = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    reaper.abort();

    assert!(swept, "reaper never swept the operation");
    assert_eq!(h.provider().canceled(), vec![pending.op_id().clone()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn spawned_dispatcher_delivers_early_events() {
    let conn = connect(FakeProvider::default());
    let host = conn.host;
    let client = conn.client;
    let dispatcher = conn.dispatcher.spawn();

    for _ in 0..100 {
        let rec = Recorder::new();
        let options = ActionOptions::default().with_internet(false);
        let pending = client.action("ses_1", "gad_1", "open", options, rec.clone());

        let (_, sinks) = host.provider().take_action();
        if let Some(bluetooth) = sinks.bluetooth {
            bluetooth.success();
        }
        sinks.global.success();

        assert!(pending.wait().await.is_ok());
        assert_eq!(
            rec.calls(),
            vec!["internet_error:CANCELED", "bluetooth_success", "success"]
        );
        assert!(client.bus().is_empty());
        assert!(host.registry().is_empty());
    }

    dispatcher.abort();
}
