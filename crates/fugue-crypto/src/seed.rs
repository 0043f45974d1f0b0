//! Seed → key derivation
//!
//! A seed is opaque text. Key material is derived from Keccak-256 subseeds:
//! `subseed(seed, index)` hashes the seed bytes together with the
//! little-endian index, and index 0 is the canonical identity of a seed.

use ed25519_dalek::SigningKey;
use fugue_primitives::{Identity, PublicKey};
use zeroize::Zeroizing;

use crate::codec::identity_from_public_key;
use crate::error::CryptoError;
use crate::hash::keccak256;

/// A derived 32-byte private key, zeroized on drop.
pub type PrivateKey = Zeroizing<[u8; 32]>;

/// Derive the indexed subseed of a seed.
pub fn subseed(seed: &str, index: u32) -> Result<PrivateKey, CryptoError> {
    if seed.is_empty() {
        return Err(CryptoError::InvalidSeed("seed is empty".to_string()));
    }
    let mut material = Vec::with_capacity(seed.len() + 4);
    material.extend_from_slice(seed.as_bytes());
    material.extend_from_slice(&index.to_le_bytes());
    Ok(Zeroizing::new(keccak256(&material)))
}

/// Derive the canonical (index 0) private key of a seed.
pub fn private_key_from_seed(seed: &str) -> Result<PrivateKey, CryptoError> {
    subseed(seed, 0)
}

/// Derive the canonical public key of a seed.
pub fn public_key_from_seed(seed: &str) -> Result<PublicKey, CryptoError> {
    let private = private_key_from_seed(seed)?;
    Ok(public_key_of(&private))
}

/// Derive the identity of the indexed subseed of a seed.
pub fn identity_from_seed(seed: &str, seed_index: u32) -> Result<Identity, CryptoError> {
    let private = subseed(seed, seed_index)?;
    Ok(identity_from_public_key(&public_key_of(&private)))
}

/// The Ed25519 public key of a derived private key.
pub(crate) fn public_key_of(private_key: &[u8; 32]) -> PublicKey {
    let signing = SigningKey::from_bytes(private_key);
    PublicKey::from_bytes(signing.verifying_key().to_bytes())
}
