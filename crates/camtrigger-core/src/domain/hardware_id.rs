//! Link-layer hardware identifiers.
//!
//! A [`HardwareId`] is a 48-bit MAC address.  Configuration files write them in
//! whatever notation the operator copied from a router page or a camera label,
//! so parsing accepts the four common forms:
//!
//! | Form            | Example              |
//! |-----------------|----------------------|
//! | colon separated | `aa:bb:cc:dd:ee:ff`  |
//! | dash separated  | `AA-BB-CC-DD-EE-FF`  |
//! | Cisco dotted    | `aabb.ccdd.eeff`     |
//! | bare hex        | `aabbccddeeff`       |
//!
//! Regardless of input form, the identifier always displays as lowercase,
//! colon-separated hex.  That canonical text is what the matching policy
//! compares against captured frames.
//!
//! Anything that is not exactly six octets is rejected, so a truncated
//! identifier such as `11:11:11:11:11` can never be registered and silently
//! match as a substring of a longer address.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when text cannot be parsed as a [`HardwareId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareIdError {
    /// The input was empty or whitespace only.
    #[error("hardware identifier is empty")]
    Empty,

    /// The input does not have the shape of a six-octet MAC address.
    #[error("'{0}' is not a six-octet hardware address")]
    InvalidFormat(String),

    /// A group contained a character that is not a hex digit.
    #[error("'{0}' contains non-hexadecimal characters")]
    InvalidHex(String),
}

/// A six-octet link-layer (MAC) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareId([u8; 6]);

impl HardwareId {
    /// Creates an identifier from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Reads an identifier from the first six bytes of `bytes`.
    ///
    /// Returns `None` when fewer than six bytes are available.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(Self(octets))
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for HardwareId {
    type Err = HardwareIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(HardwareIdError::Empty);
        }

        // Split into groups according to the notation in use, then require
        // that the groups concatenate to exactly twelve hex digits.
        let groups: Vec<&str> = if trimmed.contains(':') || trimmed.contains('-') {
            let groups: Vec<&str> = trimmed.split([':', '-']).collect();
            if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
                return Err(HardwareIdError::InvalidFormat(trimmed.to_string()));
            }
            groups
        } else if trimmed.contains('.') {
            let groups: Vec<&str> = trimmed.split('.').collect();
            if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
                return Err(HardwareIdError::InvalidFormat(trimmed.to_string()));
            }
            groups
        } else {
            if trimmed.len() != 12 {
                return Err(HardwareIdError::InvalidFormat(trimmed.to_string()));
            }
            vec![trimmed]
        };

        let digits: String = groups.concat();
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HardwareIdError::InvalidHex(trimmed.to_string()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                .map_err(|_| HardwareIdError::InvalidHex(trimmed.to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for HardwareId {
    type Error = HardwareIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HardwareId> for String {
    fn from(id: HardwareId) -> Self {
        id.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
