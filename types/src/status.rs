//! Progress states reported on status events.
//!
//! Wire names are the SCREAMING_SNAKE variant names used in the `status` field.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum! {
    /// Bluetooth progress of a `sync` operation.
    SyncStatus {
        Scanning => "SCANNING",
        Connecting => "CONNECTING",
        SyncingDevice => "SYNCING_DEVICE",
        SyncingServer => "SYNCING_SERVER",
    }
}

status_enum! {
    /// Progress of the internet path of an `action` operation.
    ActionInternetStatus {
        ExecutingAction => "EXECUTING_ACTION",
        AcquiringLocation => "ACQUIRING_LOCATION",
        WaitingForLocationInRadius => "WAITING_FOR_LOCATION_IN_RADIUS",
    }
}

status_enum! {
    /// Progress of the bluetooth path of an `action` operation.
    ActionBluetoothStatus {
        Scanning => "SCANNING",
        Connecting => "CONNECTING",
        SyncingDevice => "SYNCING_DEVICE",
        SyncingServer => "SYNCING_SERVER",
        ExecutingAction => "EXECUTING_ACTION",
    }
}
