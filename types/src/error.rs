//! Structured error taxonomy shared by every channel.
//!
//! `ErrorInfo` keeps its reason-specific sub-fields in a typed [`ErrorDetail`],
//! so a detail can only exist alongside the code that governs it. On the wire
//! the value is flat:
//!
//! ```json
//! { "code": "PERMISSION_DENIED", "description": "...", "reason": "OUT_OF_SCHEDULE",
//!   "schedule": { "weekdays": [...] }, "waitTime": 3600, "timezone": "Europe/Madrid" }
//! ```
//!
//! Decoding applies the same rule: sub-fields that belong to another tag are
//! ignored, required sub-fields that are missing or malformed are an error.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::hardware::SiteGeo;
use crate::schedule::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unexpected fault, including local guard failures.
    Internal,
    InvalidParam,
    InvalidSession,
    PermissionDenied,
    /// Every enabled communication method failed.
    AllCommMethodsFailed,
    InternetNotAvailable,
    InternetDeviceOffline,
    InternetLocationOutOfRadius,
    InternetNotPermitted,
    BluetoothDeviceNotFound,
    BluetoothDisabled,
    BluetoothNotAvailable,
    BluetoothPermissionNotGranted,
    BluetoothPermissionNotGrantedPermanently,
    Timeout,
    Canceled,
    NfcNotAvailable,
    NfcReadError,
    NfcCardNotCompatible,
    LocationDisabled,
    LocationNotAvailable,
    LocationPermissionNotGranted,
    LocationPermissionNotGrantedPermanently,
    LocationFailed,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::InvalidParam => "INVALID_PARAM",
            Self::InvalidSession => "INVALID_SESSION",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::AllCommMethodsFailed => "ALL_COMM_METHODS_FAILED",
            Self::InternetNotAvailable => "INTERNET_NOT_AVAILABLE",
            Self::InternetDeviceOffline => "INTERNET_DEVICE_OFFLINE",
            Self::InternetLocationOutOfRadius => "INTERNET_LOCATION_OUT_OF_RADIUS",
            Self::InternetNotPermitted => "INTERNET_NOT_PERMITTED",
            Self::BluetoothDeviceNotFound => "BLUETOOTH_DEVICE_NOT_FOUND",
            Self::BluetoothDisabled => "BLUETOOTH_DISABLED",
            Self::BluetoothNotAvailable => "BLUETOOTH_NOT_AVAILABLE",
            Self::BluetoothPermissionNotGranted => "BLUETOOTH_PERMISSION_NOT_GRANTED",
            Self::BluetoothPermissionNotGrantedPermanently => {
                "BLUETOOTH_PERMISSION_NOT_GRANTED_PERMANENTLY"
            }
            Self::Timeout => "TIMEOUT",
            Self::Canceled => "CANCELED",
            Self::NfcNotAvailable => "NFC_NOT_AVAILABLE",
            Self::NfcReadError => "NFC_READ_ERROR",
            Self::NfcCardNotCompatible => "NFC_CARD_NOT_COMPATIBLE",
            Self::LocationDisabled => "LOCATION_DISABLED",
            Self::LocationNotAvailable => "LOCATION_NOT_AVAILABLE",
            Self::LocationPermissionNotGranted => "LOCATION_PERMISSION_NOT_GRANTED",
            Self::LocationPermissionNotGrantedPermanently => {
                "LOCATION_PERMISSION_NOT_GRANTED_PERMANENTLY"
            }
            Self::LocationFailed => "LOCATION_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire tag of a [`DeniedReason`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionDeniedReason {
    Other,
    MemberNotStarted,
    MemberEnded,
    OutOfSchedule,
    OrganizationDisabled,
}

/// Why a `PERMISSION_DENIED` error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeniedReason {
    Other,
    /// Membership is not active yet. `starts_at` is RFC3339.
    MemberNotStarted { starts_at: String },
    /// Membership has expired. `ends_at` is RFC3339.
    MemberEnded { ends_at: String },
    /// Access attempted outside the member's schedule.
    OutOfSchedule {
        schedule: Schedule,
        /// Seconds until the schedule next allows access.
        wait_time: u64,
        /// TZDB name the schedule is interpreted in, e.g. `Europe/Madrid`.
        timezone: String,
    },
    OrganizationDisabled,
}

impl DeniedReason {
    #[must_use]
    pub const fn tag(&self) -> PermissionDeniedReason {
        match self {
            Self::Other => PermissionDeniedReason::Other,
            Self::MemberNotStarted { .. } => PermissionDeniedReason::MemberNotStarted,
            Self::MemberEnded { .. } => PermissionDeniedReason::MemberEnded,
            Self::OutOfSchedule { .. } => PermissionDeniedReason::OutOfSchedule,
            Self::OrganizationDisabled => PermissionDeniedReason::OrganizationDisabled,
        }
    }
}

/// Code-specific payload of an [`ErrorInfo`].
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    PermissionDenied(DeniedReason),
    OutOfRadius {
        site_geo: SiteGeo,
        /// Measured distance to the site, in meters.
        distance: f64,
    },
}

impl ErrorDetail {
    /// The only code this detail may be attached to.
    #[must_use]
    pub const fn governing_code(&self) -> ErrorCode {
        match self {
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::OutOfRadius { .. } => ErrorCode::InternetLocationOutOfRadius,
        }
    }
}

/// The single error value delivered to callers.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(into = "WireErrorInfo", try_from = "WireErrorInfo")]
#[error("{code}: {description}")]
pub struct ErrorInfo {
    code: ErrorCode,
    description: String,
    detail: Option<ErrorDetail>,
}

impl ErrorInfo {
    /// `PERMISSION_DENIED` without an explicit reason gets `OTHER`.
    #[must_use]
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        let detail = (code == ErrorCode::PermissionDenied)
            .then_some(ErrorDetail::PermissionDenied(DeniedReason::Other));
        Self {
            code,
            description: description.into(),
            detail,
        }
    }

    #[must_use]
    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, description)
    }

    #[must_use]
    pub fn canceled(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::Canceled, description)
    }

    #[must_use]
    pub fn permission_denied(description: impl Into<String>, reason: DeniedReason) -> Self {
        Self {
            code: ErrorCode::PermissionDenied,
            description: description.into(),
            detail: Some(ErrorDetail::PermissionDenied(reason)),
        }
    }

    #[must_use]
    pub fn out_of_radius(description: impl Into<String>, site_geo: SiteGeo, distance: f64) -> Self {
        Self {
            code: ErrorCode::InternetLocationOutOfRadius,
            description: description.into(),
            detail: Some(ErrorDetail::OutOfRadius { site_geo, distance }),
        }
    }

    /// Attaches `detail` if this error's code governs it; otherwise the detail
    /// is discarded and `self` is returned unchanged.
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        if detail.governing_code() == self.code {
            self.detail = Some(detail);
        }
        self
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn detail(&self) -> Option<&ErrorDetail> {
        self.detail.as_ref()
    }

    #[must_use]
    pub fn denied_reason(&self) -> Option<&DeniedReason> {
        match &self.detail {
            Some(ErrorDetail::PermissionDenied(reason)) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorInfoDecodeError {
    #[error("{context} requires `{field}`")]
    Missing {
        context: &'static str,
        field: &'static str,
    },
    #[error("`{field}` is malformed: {message}")]
    Malformed {
        field: &'static str,
        message: String,
    },
}

/// Flat wire shape. Sub-fields stay untyped until the governing tag says
/// they are needed, so junk under an unrelated tag never fails the decode.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireErrorInfo {
    code: ErrorCode,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    starts_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ends_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wait_time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site_geo: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distance: Option<Value>,
}

impl WireErrorInfo {
    fn bare(code: ErrorCode, description: String) -> Self {
        Self {
            code,
            description,
            reason: None,
            starts_at: None,
            ends_at: None,
            schedule: None,
            wait_time: None,
            timezone: None,
            site_geo: None,
            distance: None,
        }
    }
}

impl From<ErrorInfo> for WireErrorInfo {
    fn from(info: ErrorInfo) -> Self {
        let mut wire = Self::bare(info.code, info.description);
        match info.detail {
            None => {}
            Some(ErrorDetail::PermissionDenied(reason)) => {
                wire.reason = Some(Value::from(reason_name(reason.tag())));
                match reason {
                    DeniedReason::MemberNotStarted { starts_at } => {
                        wire.starts_at = Some(Value::String(starts_at));
                    }
                    DeniedReason::MemberEnded { ends_at } => {
                        wire.ends_at = Some(Value::String(ends_at));
                    }
                    DeniedReason::OutOfSchedule {
                        schedule,
                        wait_time,
                        timezone,
                    } => {
                        wire.schedule = serde_json::to_value(schedule).ok();
                        wire.wait_time = Some(Value::from(wait_time));
                        wire.timezone = Some(Value::String(timezone));
                    }
                    DeniedReason::Other | DeniedReason::OrganizationDisabled => {}
                }
            }
            Some(ErrorDetail::OutOfRadius { site_geo, distance }) => {
                wire.site_geo = serde_json::to_value(site_geo).ok();
                wire.distance = Some(Value::from(distance));
            }
        }
        wire
    }
}

fn reason_name(tag: PermissionDeniedReason) -> &'static str {
    match tag {
        PermissionDeniedReason::Other => "OTHER",
        PermissionDeniedReason::MemberNotStarted => "MEMBER_NOT_STARTED",
        PermissionDeniedReason::MemberEnded => "MEMBER_ENDED",
        PermissionDeniedReason::OutOfSchedule => "OUT_OF_SCHEDULE",
        PermissionDeniedReason::OrganizationDisabled => "ORGANIZATION_DISABLED",
    }
}

fn required<T: DeserializeOwned>(
    value: Option<Value>,
    context: &'static str,
    field: &'static str,
) -> Result<T, ErrorInfoDecodeError> {
    let value = value.ok_or(ErrorInfoDecodeError::Missing { context, field })?;
    serde_json::from_value(value).map_err(|e| ErrorInfoDecodeError::Malformed {
        field,
        message: e.to_string(),
    })
}

impl TryFrom<WireErrorInfo> for ErrorInfo {
    type Error = ErrorInfoDecodeError;

    fn try_from(wire: WireErrorInfo) -> Result<Self, Self::Error> {
        let detail = match wire.code {
            ErrorCode::PermissionDenied => {
                let tag: PermissionDeniedReason =
                    required(wire.reason, "PERMISSION_DENIED", "reason")?;
                let reason = match tag {
                    PermissionDeniedReason::Other => DeniedReason::Other,
                    PermissionDeniedReason::OrganizationDisabled => {
                        DeniedReason::OrganizationDisabled
                    }
                    PermissionDeniedReason::MemberNotStarted => DeniedReason::MemberNotStarted {
                        starts_at: required(wire.starts_at, "MEMBER_NOT_STARTED", "startsAt")?,
                    },
                    PermissionDeniedReason::MemberEnded => DeniedReason::MemberEnded {
                        ends_at: required(wire.ends_at, "MEMBER_ENDED", "endsAt")?,
                    },
                    PermissionDeniedReason::OutOfSchedule => DeniedReason::OutOfSchedule {
                        schedule: required(wire.schedule, "OUT_OF_SCHEDULE", "schedule")?,
                        wait_time: required(wire.wait_time, "OUT_OF_SCHEDULE", "waitTime")?,
                        timezone: required(wire.timezone, "OUT_OF_SCHEDULE", "timezone")?,
                    },
                };
                Some(ErrorDetail::PermissionDenied(reason))
            }
            // Geofence details are optional, but only as a pair.
            ErrorCode::InternetLocationOutOfRadius => match (wire.site_geo, wire.distance) {
                (None, None) => None,
                (site_geo, distance) => Some(ErrorDetail::OutOfRadius {
                    site_geo: required(site_geo, "INTERNET_LOCATION_OUT_OF_RADIUS", "siteGeo")?,
                    distance: required(distance, "INTERNET_LOCATION_OUT_OF_RADIUS", "distance")?,
                }),
            },
            _ => None,
        };
        Ok(Self {
            code: wire.code,
            description: wire.description,
            detail,
        })
    }
}
