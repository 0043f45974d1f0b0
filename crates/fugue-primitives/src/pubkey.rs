//! 32-byte public key type

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PrimitiveError;

/// A 32-byte ledger public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Size of a public key in bytes
    pub const LEN: usize = 32;

    /// The all-zero public key
    pub const ZERO: PublicKey = PublicKey([0u8; 32]);

    /// Create a public key from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    /// Create a public key from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, PrimitiveError> {
        if slice.len() != Self::LEN {
            return Err(PrimitiveError::PublicKeyLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(PublicKey(bytes))
    }

    /// Parse a public key from a hex string (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PrimitiveError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero key
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_round_trip() {
        let hex = "aa".repeat(32);
        let pk = PublicKey::from_hex(&hex).unwrap();
        assert_eq!(pk.to_hex(), hex);
        assert_eq!(pk.as_bytes(), &[0xaa; 32]);
    }

    #[test]
    fn test_from_hex_with_prefix() {
        let pk = PublicKey::from_hex(&format!("0x{}", "01".repeat(32))).unwrap();
        assert_eq!(pk.as_bytes()[0], 1);
    }

    #[test]
    fn test_from_slice_wrong_length() {
        assert!(matches!(
            PublicKey::from_slice(&[0u8; 31]),
            Err(PrimitiveError::PublicKeyLength(31))
        ));
    }

    #[test]
    fn test_zero() {
        assert!(PublicKey::ZERO.is_zero());
        assert!(!PublicKey::from_bytes([1u8; 32]).is_zero());
    }
}
