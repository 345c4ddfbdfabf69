//! Session, catalog and capability pass-throughs

use latchkey_types::ErrorCode;

use crate::common::Harness;

#[tokio::test]
async fn session_round_trip() {
    let h = Harness::new();
    let native = h.client.native();

    assert!(native.session_ids().await.unwrap().is_empty());
    let id = native.add_session("tok").await.unwrap();
    assert_eq!(id, "ses_3");
    assert_eq!(native.session_ids().await.unwrap(), vec!["ses_3"]);

    native.refresh_session(&id).await.unwrap();
    native.refresh_all_sessions().await.unwrap();

    native.remove_session(&id).await.unwrap();
    let err = native.refresh_session(&id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSession);

    native.add_session("a").await.unwrap();
    native.add_session("bb").await.unwrap();
    native.remove_all_sessions().await.unwrap();
    assert!(native.session_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn provider_errors_keep_their_code() {
    let h = Harness::new();
    let err = h.client.native().add_session("").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParam);
    assert_eq!(err.description(), "empty token");
}

#[tokio::test]
async fn foreign_failures_become_internal() {
    let h = Harness::new();
    let err = h.client.native().hardwares("ses_1").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(err.description().contains("backend unreachable"));
}

#[tokio::test]
async fn catalog_and_capabilities() {
    let h = Harness::new();
    let native = h.client.native();

    let gadgets = native.gadgets("ses_1").await.unwrap();
    assert_eq!(gadgets.len(), 1);
    assert_eq!(gadgets[0].actions[0].id, "open");

    assert!(native.is_bluetooth_supported());
    assert!(!native.is_card_emulation_supported().await.unwrap());
    assert_eq!(native.version(), "test");
    assert_eq!(
        native.start_card_emulation().await.unwrap_err().code(),
        ErrorCode::InvalidParam
    );
}
