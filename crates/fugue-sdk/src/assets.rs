//! Asset helpers
//!
//! Asset names are at most 7 printable ASCII characters, starting with an
//! uppercase letter, carried on the wire as a zero-padded u64. The transfer
//! payload is a fixed 80-byte buffer: issuer key, new-owner key, wire name,
//! amount.

use fugue_primitives::Identity;

use crate::SdkError;

/// Wire size of an asset-transfer payload
pub const ASSET_TRANSFER_PAYLOAD_SIZE: usize = 80;

/// A validated asset name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetName(String);

impl AssetName {
    /// Maximum name length in characters
    pub const MAX_LEN: usize = 7;

    /// Validate and construct an asset name.
    pub fn new(name: &str) -> Result<Self, SdkError> {
        if name.is_empty() || name.len() > Self::MAX_LEN {
            return Err(SdkError::AssetName(format!(
                "{name:?} must be 1 to {} characters",
                Self::MAX_LEN
            )));
        }
        if !name.is_ascii() {
            return Err(SdkError::AssetName(format!("{name:?} contains non-ASCII characters")));
        }
        let mut chars = name.chars();
        let first = chars.next().expect("non-empty");
        if !first.is_ascii_uppercase() {
            return Err(SdkError::AssetName(format!(
                "{name:?} must start with an uppercase letter"
            )));
        }
        if let Some(c) = chars.find(|c| !c.is_ascii_uppercase() && !c.is_ascii_digit()) {
            return Err(SdkError::AssetName(format!(
                "{name:?} contains invalid character {c:?}"
            )));
        }
        Ok(AssetName(name.to_string()))
    }

    /// The textual name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The zero-padded 8-byte wire form.
    pub fn to_wire(&self) -> [u8; 8] {
        let mut wire = [0u8; 8];
        wire[..self.0.len()].copy_from_slice(self.0.as_bytes());
        wire
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode an asset ownership/possession transfer payload.
pub fn encode_asset_transfer(
    issuer: &Identity,
    new_owner: &Identity,
    asset: &AssetName,
    amount: i64,
) -> Result<Vec<u8>, SdkError> {
    let issuer_key = fugue_crypto::public_key_from_identity(issuer)?;
    let owner_key = fugue_crypto::public_key_from_identity(new_owner)?;

    let mut payload = Vec::with_capacity(ASSET_TRANSFER_PAYLOAD_SIZE);
    payload.extend_from_slice(issuer_key.as_bytes());
    payload.extend_from_slice(owner_key.as_bytes());
    payload.extend_from_slice(&asset.to_wire());
    payload.extend_from_slice(&amount.to_le_bytes());
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugue_primitives::PublicKey;

    fn identity(byte: u8) -> Identity {
        fugue_crypto::identity_from_public_key(&PublicKey::from_bytes([byte; 32]))
    }

    #[test]
    fn test_valid_names() {
        for name in ["QX", "FUGUE", "A", "TOK3N", "AAAAAAA"] {
            assert!(AssetName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "TOOLONGX", "lower", "1LEAD", "WIDE¢", "SP ACE"] {
            assert!(
                matches!(AssetName::new(name), Err(SdkError::AssetName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_wire_form_zero_padded() {
        let name = AssetName::new("QX").unwrap();
        assert_eq!(name.to_wire(), [b'Q', b'X', 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_transfer_payload_layout() {
        let asset = AssetName::new("FUGUE").unwrap();
        let payload = encode_asset_transfer(&identity(1), &identity(2), &asset, 500).unwrap();

        assert_eq!(payload.len(), ASSET_TRANSFER_PAYLOAD_SIZE);
        assert_eq!(&payload[..32], &[1u8; 32]);
        assert_eq!(&payload[32..64], &[2u8; 32]);
        assert_eq!(&payload[64..72], &asset.to_wire());
        assert_eq!(&payload[72..80], &500i64.to_le_bytes());
    }
}
