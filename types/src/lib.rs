//! Core domain types for Latchkey.
//!
//! Pure values shared by both sides of the bridge: operation identities, the
//! error taxonomy, catalog descriptors, card identity, progress statuses and
//! action options. No IO, no async.

mod card;
mod error;
mod hardware;
mod ids;
mod options;
pub mod schedule;
mod status;

pub use card::{CardInfo, CardUid, CardUidError};
pub use error::{
    DeniedReason, ErrorCode, ErrorDetail, ErrorInfo, ErrorInfoDecodeError, PermissionDeniedReason,
};
pub use hardware::{Gadget, GadgetAction, Hardware, Location, SiteGeo};
pub use ids::OperationId;
pub use options::ActionOptions;
pub use schedule::{Schedule, ScheduleError, ScheduleRange, ScheduleWeekday, Weekday};
pub use status::{ActionBluetoothStatus, ActionInternetStatus, SyncStatus};
