//! Named events crossing the boundary.
//!
//! Every event carries its operation identity in `params.opId`. The rest of
//! the payload depends on the name:
//!
//! | field      | events                                        |
//! |------------|-----------------------------------------------|
//! | `hardware` | `scan_discover`                               |
//! | `status`   | `sync_status`, `action_status_*`              |
//! | `percent`  | `sync_status_progress`, `action_bluetooth_status_progress` |
//! | `error`    | every `*_error`                               |
//! | `card`     | `scan_card_success`                           |

use std::fmt;
use std::str::FromStr;

use latchkey_types::OperationId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

/// Key of the operation identity inside `params`.
pub const OP_ID_FIELD: &str = "opId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    ScanDiscover,
    ScanSuccess,
    ScanError,
    SyncStatus,
    SyncStatusProgress,
    SyncSuccess,
    SyncError,
    ActionSuccess,
    ActionError,
    ActionStatusInternet,
    ActionInternetSuccess,
    ActionInternetError,
    ActionStatusBluetooth,
    ActionBluetoothStatusProgress,
    ActionBluetoothSuccess,
    ActionBluetoothError,
    ScanCardSuccess,
    ScanCardError,
}

impl EventName {
    pub const ALL: [EventName; 18] = [
        EventName::ScanDiscover,
        EventName::ScanSuccess,
        EventName::ScanError,
        EventName::SyncStatus,
        EventName::SyncStatusProgress,
        EventName::SyncSuccess,
        EventName::SyncError,
        EventName::ActionSuccess,
        EventName::ActionError,
        EventName::ActionStatusInternet,
        EventName::ActionInternetSuccess,
        EventName::ActionInternetError,
        EventName::ActionStatusBluetooth,
        EventName::ActionBluetoothStatusProgress,
        EventName::ActionBluetoothSuccess,
        EventName::ActionBluetoothError,
        EventName::ScanCardSuccess,
        EventName::ScanCardError,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventName::ScanDiscover => "scan_discover",
            EventName::ScanSuccess => "scan_success",
            EventName::ScanError => "scan_error",
            EventName::SyncStatus => "sync_status",
            EventName::SyncStatusProgress => "sync_status_progress",
            EventName::SyncSuccess => "sync_success",
            EventName::SyncError => "sync_error",
            EventName::ActionSuccess => "action_success",
            EventName::ActionError => "action_error",
            EventName::ActionStatusInternet => "action_status_internet",
            EventName::ActionInternetSuccess => "action_internet_success",
            EventName::ActionInternetError => "action_internet_error",
            EventName::ActionStatusBluetooth => "action_status_bluetooth",
            EventName::ActionBluetoothStatusProgress => "action_bluetooth_status_progress",
            EventName::ActionBluetoothSuccess => "action_bluetooth_success",
            EventName::ActionBluetoothError => "action_bluetooth_error",
            EventName::ScanCardSuccess => "scan_card_success",
            EventName::ScanCardError => "scan_card_error",
        }
    }

    /// Whether this event ends its channel.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(
            self,
            EventName::ScanDiscover
                | EventName::SyncStatus
                | EventName::SyncStatusProgress
                | EventName::ActionStatusInternet
                | EventName::ActionStatusBluetooth
                | EventName::ActionBluetoothStatusProgress
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event name {0:?}")]
pub struct UnknownEventName(pub String);

impl FromStr for EventName {
    type Err = UnknownEventName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownEventName(s.to_string()))
    }
}

/// One `(name, params)` pair on the shared stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: EventName,
    pub params: Value,
}

impl Event {
    /// An event whose params hold only the operation identity.
    #[must_use]
    pub fn new(name: EventName, op_id: &OperationId) -> Self {
        let mut params = Map::new();
        params.insert(OP_ID_FIELD.to_string(), Value::String(op_id.to_string()));
        Self {
            name,
            params: Value::Object(params),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(params) = &mut self.params {
            params.insert(key.to_string(), value);
        }
        self
    }

    #[must_use]
    pub fn op_id(&self) -> Option<&str> {
        self.params.get(OP_ID_FIELD).and_then(Value::as_str)
    }

    /// Decode one payload field. A missing field decodes from `null`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, serde_json::Error> {
        field(&self.params, key)
    }
}

pub(crate) fn field<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, serde_json::Error> {
    T::deserialize(params.get(key).unwrap_or(&Value::Null))
}

pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Sending half of the event stream, held by the host.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventEmitter {
    #[must_use]
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: Event) {
        tracing::trace!(event = %event.name, op_id = event.op_id().unwrap_or(""), "emit");
        if self.tx.send(event).is_err() {
            tracing::trace!("event stream closed; event dropped");
        }
    }
}
