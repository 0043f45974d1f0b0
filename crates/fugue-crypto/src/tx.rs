//! Transaction wire encoding, signing, and id hashing
//!
//! Wire layout of a signed transaction:
//!
//! ```text
//! src_pk(32) ‖ dst_pk(32) ‖ amount u64 LE ‖ tick u32 LE
//!           ‖ input_type u16 LE ‖ input_size u16 LE ‖ input ‖ signature(64)
//! ```
//!
//! The signature is Ed25519 over the Keccak-256 digest of everything before
//! it. The transaction id is the lowercase base-26 encoding of the
//! Keccak-256 digest of the full signed bytes.

use ed25519_dalek::{Signer, SigningKey};
use fugue_primitives::PublicKey;

use crate::codec::encode_base26;
use crate::error::CryptoError;
use crate::hash::keccak256;

/// Length of a transaction signature in bytes
pub const SIGNATURE_LEN: usize = 64;

/// Unsigned transaction header
#[derive(Debug, Clone)]
pub struct TxHeader {
    /// Source public key
    pub source_public_key: PublicKey,
    /// Destination public key
    pub destination_public_key: PublicKey,
    /// Amount in base units
    pub amount: u64,
    /// Target tick (wire width)
    pub tick: u32,
    /// Contract input type (0 for plain transfers)
    pub input_type: u16,
    /// Contract input payload (empty for plain transfers)
    pub input: Vec<u8>,
}

/// Encode and sign a transaction.
pub fn build_signed_transaction(
    header: &TxHeader,
    private_key: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    let input_size =
        u16::try_from(header.input.len()).map_err(|_| CryptoError::InputTooLarge(header.input.len()))?;

    let mut bytes = Vec::with_capacity(32 + 32 + 8 + 4 + 2 + 2 + header.input.len() + SIGNATURE_LEN);
    bytes.extend_from_slice(header.source_public_key.as_bytes());
    bytes.extend_from_slice(header.destination_public_key.as_bytes());
    bytes.extend_from_slice(&header.amount.to_le_bytes());
    bytes.extend_from_slice(&header.tick.to_le_bytes());
    bytes.extend_from_slice(&header.input_type.to_le_bytes());
    bytes.extend_from_slice(&input_size.to_le_bytes());
    bytes.extend_from_slice(&header.input);

    let digest = keccak256(&bytes);
    let signing = SigningKey::from_bytes(private_key);
    let signature = signing.sign(&digest);
    bytes.extend_from_slice(&signature.to_bytes());

    Ok(bytes)
}

/// Compute the deterministic id of a signed transaction.
pub fn transaction_id(signed_bytes: &[u8]) -> String {
    encode_base26(&keccak256(signed_bytes), true)
}
