//! Canonical Primitive Types for the Dividend Ledger
//!
//! Rule: No String identifiers in ledger state. Ever.
//!
//! These types are:
//! - Fixed-size (no dynamic allocation)
//! - Deterministically serializable
//! - Cheap to copy and compare

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Token and dividend amounts in the smallest currency unit
pub type Amount = u128;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 32-byte account identity
///
/// The all-zero address is the *null identity*: it never holds tokens and is
/// used as the `from` side of mint notices.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The null identity
    pub const NULL: Self = Self([0u8; 32]);

    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the null identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string (an optional `0x` prefix is accepted)
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 64 {
            return Err(AddressParseError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Serde adapter encoding an [`Address`] as a hex string
///
/// Use with `#[serde(with = "lib_types::address_hex")]` in human-edited
/// formats (TOML config, JSON snapshots).
pub mod address_hex {
    use super::Address;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::from_hex(&text).map_err(D::Error::custom)
    }
}

/// Failure to parse an [`Address`] from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("Address must be 64 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("Address is not valid hex: {0}")]
    InvalidHex(String),
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_basics() {
        let addr = Address::new([3u8; 32]);
        assert!(!addr.is_zero());
        assert_eq!(addr.as_bytes(), &[3u8; 32]);

        assert!(Address::NULL.is_zero());
        assert_eq!(Address::NULL, Address::default());
    }

    #[test]
    fn test_from_array() {
        let bytes = [5u8; 32];
        let addr: Address = bytes.into();
        assert_eq!(addr.0, bytes);
    }

    #[test]
    fn test_hex_display_and_parse() {
        let addr = Address::new([0xabu8; 32]);
        let text = addr.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Address>().unwrap(), addr);

        let prefixed = format!("0x{}", text);
        assert_eq!(Address::from_hex(&prefixed).unwrap(), addr);
    }

    #[test]
    fn test_hex_parse_errors() {
        assert_eq!(
            Address::from_hex("abcd"),
            Err(AddressParseError::InvalidLength(4))
        );
        let bad = "zz".repeat(32);
        assert!(matches!(
            Address::from_hex(&bad),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_debug_is_abbreviated() {
        let addr = Address::new([1u8; 32]);
        assert_eq!(format!("{:?}", addr), "Address(0101010101010101)");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let addr = Address::new([42u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
