//! Card scan and the single-card session

use std::sync::atomic::Ordering;

use latchkey_bridge::ProviderError;
use latchkey_types::ErrorCode;

use crate::common::{FakeCard, Harness, Recorder};

#[tokio::test]
async fn scanned_card_can_be_updated_by_matching_uid() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h.client.scan_card(rec.clone());

    let card = FakeCard::new(&[0xab, 0x12]);
    let updates = card.updates.clone();
    h.provider().take_card_scan().success(Box::new(card));
    h.pump();

    let scanned = pending.wait().await.unwrap();
    assert_eq!(scanned.uid(), "AB12");
    assert!(scanned.is_akiles_card());
    assert_eq!(rec.calls(), vec!["card:AB12"]);

    h.client.native().update_card("ab12").await.unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 1);

    let err = h.client.native().update_card("AB13").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert_eq!(
        err.description(),
        "Card with UID AB13 does not match last scanned card (AB12)"
    );
    assert_eq!(updates.load(Ordering::SeqCst), 1);

    scanned.update().await.unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn update_without_scanned_card_fails() {
    let h = Harness::new();
    let err = h.client.native().update_card("AB12").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert_eq!(err.description(), "No card has been scanned yet");
}

#[tokio::test]
async fn close_only_acts_on_the_held_card() {
    let mut h = Harness::new();
    let pending = h.client.scan_card(std::sync::Arc::new(()));
    let card = FakeCard::new(&[0x01, 0x02]);
    let closes = card.closes.clone();
    h.provider().take_card_scan().success(Box::new(card));
    h.pump();
    let scanned = pending.wait().await.unwrap();

    h.client.native().close_card("FFFF");
    assert_eq!(closes.load(Ordering::SeqCst), 0);
    assert!(h.host.cards().held_uid().is_some());

    scanned.close();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(h.host.cards().held_uid().is_none());

    // Already closed: nothing left to close.
    scanned.close();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(scanned.update().await.is_err());
}

#[tokio::test]
async fn new_scan_supersedes_previous_card() {
    let mut h = Harness::new();

    let first = h.client.scan_card(std::sync::Arc::new(()));
    h.provider()
        .take_card_scan()
        .success(Box::new(FakeCard::new(&[0x0a])));
    h.pump();
    let old = first.wait().await.unwrap();

    let second = h.client.scan_card(std::sync::Arc::new(()));
    let card = FakeCard::new(&[0x0b]);
    let updates = card.updates.clone();
    h.provider().take_card_scan().success(Box::new(card));
    h.pump();
    let new = second.wait().await.unwrap();

    let err = old.update().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    new.update().await.unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scan_error_is_reported() {
    let mut h = Harness::new();
    let rec = Recorder::new();
    let pending = h.client.scan_card(rec.clone());

    h.provider()
        .take_card_scan()
        .error(ProviderError::new(ErrorCode::NfcNotAvailable, "no reader"));
    h.pump();

    assert_eq!(rec.calls(), vec!["error:NFC_NOT_AVAILABLE"]);
    assert_eq!(
        pending.wait().await.unwrap_err().code(),
        ErrorCode::NfcNotAvailable
    );
    assert!(h.host.cards().held_uid().is_none());
}
