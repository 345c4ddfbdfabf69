//! Callbacks that print every event as one line on stdout.

use latchkey_bridge::{ActionCallback, Card, ScanCallback, ScanCardCallback, SyncCallback};
use latchkey_types::{
    ActionBluetoothStatus, ActionInternetStatus, ErrorInfo, Hardware, SyncStatus,
};

pub struct Printer;

fn failed(channel: &str, error: &ErrorInfo) {
    match error.detail() {
        Some(detail) => println!("{channel}error  {error} ({detail:?})"),
        None => println!("{channel}error  {error}"),
    }
}

impl ScanCallback for Printer {
    fn on_discover(&self, hardware: &Hardware) {
        println!("discovered  {} ({})", hardware.id, hardware.name);
    }

    fn on_success(&self) {
        println!("scan finished");
    }

    fn on_error(&self, error: &ErrorInfo) {
        failed("", error);
    }
}

impl SyncCallback for Printer {
    fn on_status(&self, status: SyncStatus) {
        println!("status  {status}");
    }

    fn on_status_progress(&self, percent: f64) {
        println!("progress  {percent:.0}%");
    }

    fn on_success(&self) {
        println!("sync finished");
    }

    fn on_error(&self, error: &ErrorInfo) {
        failed("", error);
    }
}

impl ActionCallback for Printer {
    fn on_success(&self) {
        println!("action succeeded");
    }

    fn on_error(&self, error: &ErrorInfo) {
        failed("", error);
    }

    fn on_internet_status(&self, status: ActionInternetStatus) {
        println!("internet  status {status}");
    }

    fn on_internet_success(&self) {
        println!("internet  done");
    }

    fn on_internet_error(&self, error: &ErrorInfo) {
        failed("internet  ", error);
    }

    fn on_bluetooth_status(&self, status: ActionBluetoothStatus) {
        println!("bluetooth status {status}");
    }

    fn on_bluetooth_status_progress(&self, percent: f64) {
        println!("bluetooth progress {percent:.0}%");
    }

    fn on_bluetooth_success(&self) {
        println!("bluetooth done");
    }

    fn on_bluetooth_error(&self, error: &ErrorInfo) {
        failed("bluetooth ", error);
    }
}

impl ScanCardCallback for Printer {
    fn on_success(&self, card: &Card) {
        println!(
            "card  {} (akiles: {})",
            card.uid(),
            card.is_akiles_card()
        );
    }

    fn on_error(&self, error: &ErrorInfo) {
        failed("", error);
    }
}
