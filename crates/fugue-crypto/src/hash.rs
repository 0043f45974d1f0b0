//! Digest helpers

use sha3::{Digest, Keccak256};

/// Keccak-256 digest of the input
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
