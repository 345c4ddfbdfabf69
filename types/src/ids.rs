use std::borrow::Borrow;
use std::fmt;

/// Opaque identity of one long-running operation.
///
/// Minted by the host when the operation starts and carried in the `opId`
/// field of every event the operation produces. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for OperationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `OperationId` be queried with the raw `opId` string.
impl Borrow<str> for OperationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
