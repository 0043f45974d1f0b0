//! Base-26 identity codec
//!
//! A 32-byte public key is encoded as 60 characters: the four little-endian
//! u64 limbs of the key, 14 base-26 digits each (least significant digit
//! first), followed by a 4-character checksum derived from the Keccak-256
//! digest of the key. Uppercase is the canonical identity form; the
//! lowercase variant is used for transaction ids.

use fugue_primitives::{Identity, PublicKey};

use crate::error::CryptoError;
use crate::hash::keccak256;

const LIMBS: usize = 4;
const DIGITS_PER_LIMB: usize = 14;
const CHECKSUM_DIGITS: usize = 4;

/// Encode 32 bytes into the 60-character base-26 form.
pub(crate) fn encode_base26(bytes: &[u8; 32], lowercase: bool) -> String {
    let alpha = if lowercase { b'a' } else { b'A' };
    let mut out = String::with_capacity(60);

    for limb_idx in 0..LIMBS {
        let mut limb = u64::from_le_bytes(
            bytes[limb_idx * 8..limb_idx * 8 + 8]
                .try_into()
                .expect("8-byte chunk"),
        );
        for _ in 0..DIGITS_PER_LIMB {
            out.push((alpha + (limb % 26) as u8) as char);
            limb /= 26;
        }
    }

    let mut checksum = checksum_value(bytes);
    for _ in 0..CHECKSUM_DIGITS {
        out.push((alpha + (checksum % 26) as u8) as char);
        checksum /= 26;
    }

    out
}

/// The 24-bit checksum of a public key.
fn checksum_value(bytes: &[u8; 32]) -> u32 {
    let digest = keccak256(bytes);
    u32::from_le_bytes([digest[0], digest[1], digest[2], 0])
}

/// Convert a 32-byte public key into its 60-character identity.
pub fn identity_from_public_key(public_key: &PublicKey) -> Identity {
    Identity::from_raw_unchecked(encode_base26(public_key.as_bytes(), false))
}

/// Decode an identity back into its 32-byte public key.
///
/// Validates both the digit range of each limb and the trailing checksum.
pub fn public_key_from_identity(identity: &Identity) -> Result<PublicKey, CryptoError> {
    let chars = identity.as_str().as_bytes();
    let mut bytes = [0u8; 32];

    for limb_idx in 0..LIMBS {
        let digits = &chars[limb_idx * DIGITS_PER_LIMB..(limb_idx + 1) * DIGITS_PER_LIMB];
        // Digits are stored least significant first; fold from the top.
        let mut limb: u128 = 0;
        for &d in digits.iter().rev() {
            limb = limb * 26 + u128::from(d - b'A');
        }
        let limb = u64::try_from(limb).map_err(|_| {
            CryptoError::InvalidIdentity(format!("limb {limb_idx} out of range"))
        })?;
        bytes[limb_idx * 8..limb_idx * 8 + 8].copy_from_slice(&limb.to_le_bytes());
    }

    let mut checksum = checksum_value(&bytes);
    for &d in &chars[LIMBS * DIGITS_PER_LIMB..] {
        if d - b'A' != (checksum % 26) as u8 {
            return Err(CryptoError::ChecksumMismatch);
        }
        checksum /= 26;
    }

    Ok(PublicKey::from_bytes(bytes))
}
