//! The boundary surface the client calls into.
//!
//! Long-running calls are fire-and-forget: they return the operation's
//! identity at once, and everything else arrives later as events tagged with
//! it. Request/response calls resolve to an [`ErrorInfo`] on failure.

use std::future::Future;
use std::pin::Pin;

use latchkey_types::{ActionOptions, ErrorInfo, Gadget, Hardware, OperationId};

pub type NativeFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, ErrorInfo>> + Send + 'a>>;

pub trait NativeModule: Send + Sync {
    fn scan(&self) -> OperationId;

    fn sync(&self, session_id: &str, hardware_id: &str) -> OperationId;

    fn action(
        &self,
        session_id: &str,
        gadget_id: &str,
        action_id: &str,
        options: ActionOptions,
    ) -> OperationId;

    fn scan_card(&self) -> OperationId;

    /// Fire-and-forget. Unknown or finished operations are ignored.
    fn cancel(&self, id: &OperationId);

    /// Fails locally with `INTERNAL` unless `uid` is the held card.
    fn update_card<'a>(&'a self, uid: &'a str) -> NativeFut<'a, ()>;

    /// Ignored unless `uid` is the held card.
    fn close_card(&self, uid: &str);

    fn session_ids(&self) -> NativeFut<'_, Vec<String>>;

    fn add_session<'a>(&'a self, token: &'a str) -> NativeFut<'a, String>;

    fn remove_session<'a>(&'a self, id: &'a str) -> NativeFut<'a, ()>;

    fn remove_all_sessions(&self) -> NativeFut<'_, ()>;

    fn refresh_session<'a>(&'a self, id: &'a str) -> NativeFut<'a, ()>;

    fn refresh_all_sessions(&self) -> NativeFut<'_, ()>;

    fn gadgets<'a>(&'a self, session_id: &'a str) -> NativeFut<'a, Vec<Gadget>>;

    fn hardwares<'a>(&'a self, session_id: &'a str) -> NativeFut<'a, Vec<Hardware>>;

    fn is_bluetooth_supported(&self) -> bool;

    fn is_card_emulation_supported(&self) -> NativeFut<'_, bool>;

    fn start_card_emulation(&self) -> NativeFut<'_, ()>;

    fn version(&self) -> String;
}
