//! Contactless card identity.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardUidError {
    #[error("card UID must not be empty")]
    Empty,
    #[error("card UID has an odd number of hex digits ({0})")]
    OddLength(usize),
    #[error("card UID contains a non-hex character {0:?}")]
    InvalidDigit(char),
}

/// Raw card UID bytes. Rendered as uppercase hex with no separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardUid(Vec<u8>);

impl CardUid {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in &self.0 {
            let _ = write!(out, "{byte:02X}");
        }
        out
    }

    /// Case-insensitive comparison against a hex rendering.
    ///
    /// Input that is not valid hex never matches.
    #[must_use]
    pub fn matches(&self, uid: &str) -> bool {
        self.to_hex().eq_ignore_ascii_case(uid)
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CardUid {
    type Err = CardUidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CardUidError::Empty);
        }
        if s.len() % 2 != 0 {
            return Err(CardUidError::OddLength(s.len()));
        }
        let digits: Vec<u8> = s
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or(CardUidError::InvalidDigit(c))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self(
            digits
                .chunks_exact(2)
                .map(|pair| (pair[0] << 4) | pair[1])
                .collect(),
        ))
    }
}

/// Card descriptor carried by `scan_card_success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub uid: String,
    pub is_akiles_card: bool,
}

impl CardInfo {
    #[must_use]
    pub fn new(uid: &CardUid, is_akiles_card: bool) -> Self {
        Self {
            uid: uid.to_hex(),
            is_akiles_card,
        }
    }
}
