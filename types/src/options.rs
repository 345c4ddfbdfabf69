use serde::{Deserialize, Serialize};

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

/// Options customizing an `action` operation. Every toggle defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    /// Request Bluetooth permission from the user if it hasn't been granted.
    /// If false, the bluetooth path errors with `BLUETOOTH_PERMISSION_NOT_GRANTED`.
    #[serde(default = "default_true")]
    pub request_bluetooth_permission: bool,
    /// Request location permission from the user if it hasn't been granted.
    /// If false, the internet path errors with `LOCATION_PERMISSION_NOT_GRANTED`
    /// when the device has a geofence.
    #[serde(default = "default_true")]
    pub request_location_permission: bool,
    /// Try the internet path. If false, it immediately errors with `CANCELED`.
    #[serde(default = "default_true")]
    pub use_internet: bool,
    /// Try the bluetooth path. If false, it immediately errors with `CANCELED`.
    #[serde(default = "default_true")]
    pub use_bluetooth: bool,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            request_bluetooth_permission: true,
            request_location_permission: true,
            use_internet: true,
            use_bluetooth: true,
        }
    }
}

impl ActionOptions {
    #[must_use]
    pub fn with_internet(mut self, enabled: bool) -> Self {
        self.use_internet = enabled;
        self
    }

    #[must_use]
    pub fn with_bluetooth(mut self, enabled: bool) -> Self {
        self.use_bluetooth = enabled;
        self
    }

    #[must_use]
    pub fn with_bluetooth_permission_request(mut self, enabled: bool) -> Self {
        self.request_bluetooth_permission = enabled;
        self
    }

    #[must_use]
    pub fn with_location_permission_request(mut self, enabled: bool) -> Self {
        self.request_location_permission = enabled;
        self
    }
}
