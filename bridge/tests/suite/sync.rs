//! Synchronization driver

use latchkey_types::{
    DeniedReason, ErrorCode, ErrorInfo, Schedule, ScheduleRange, ScheduleWeekday, SyncStatus,
};

use crate::common::{Harness, Recorder};

#[tokio::test]
async fn status_and_progress_then_success() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h.client.sync("ses_1", "hw_1", rec.clone());

    let sink = h.provider().take_sync();
    sink.status(SyncStatus::Scanning);
    sink.status(SyncStatus::Connecting);
    sink.progress(12.5);
    // Progress is forwarded even when it goes backwards.
    sink.progress(10.0);
    sink.status(SyncStatus::SyncingDevice);
    sink.status(SyncStatus::SyncingServer);
    sink.success();
    h.pump();

    assert_eq!(
        rec.calls(),
        vec![
            "status:SCANNING",
            "status:CONNECTING",
            "progress:12.5",
            "progress:10",
            "status:SYNCING_DEVICE",
            "status:SYNCING_SERVER",
            "success",
        ]
    );
    assert!(pending.wait().await.is_ok());
    assert!(h.host.registry().is_empty());
}

#[tokio::test]
async fn structured_error_survives_the_boundary() {
    let mut h = Harness::new();
    let pending = h.client.sync("ses_1", "hw_1", std::sync::Arc::new(()));

    let weekday =
        ScheduleWeekday::new(vec![ScheduleRange::new(8 * 3600, 18 * 3600).unwrap()]).unwrap();
    let schedule = Schedule::new(vec![weekday; 7]).unwrap();
    let reason = DeniedReason::OutOfSchedule {
        schedule,
        wait_time: 5400,
        timezone: "Europe/Madrid".into(),
    };
    h.provider()
        .take_sync()
        .error(ErrorInfo::permission_denied("outside schedule", reason.clone()));
    h.pump();

    let err = pending.wait().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PermissionDenied);
    assert_eq!(err.denied_reason(), Some(&reason));
}

#[test]
fn terminal_fires_once_even_if_sink_is_then_dropped() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let _pending = h.client.sync("ses_1", "hw_1", rec.clone());

    let sink = h.provider().take_sync();
    sink.success();
    h.pump();

    assert_eq!(rec.count("success"), 1);
    assert_eq!(rec.calls().len(), 1);
}

#[tokio::test]
async fn dropped_sink_without_cancel_is_internal() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h.client.sync("ses_1", "hw_1", rec.clone());

    drop(h.provider().take_sync());
    h.pump();

    assert_eq!(rec.calls(), vec!["error:INTERNAL"]);
    assert_eq!(pending.wait().await.unwrap_err().code(), ErrorCode::Internal);
    assert!(h.host.registry().is_empty());
}
