//! Send-many procedure payload
//!
//! Fixed 1000-byte buffer: 25 destination public keys (32 bytes each) from
//! offset 0, then 25 amounts as signed 64-bit little-endian integers from
//! offset 800. Empty slots stay zero-filled.

use fugue_primitives::Identity;

use crate::SdkError;

/// Number of transfer slots in one payload
pub const SEND_MANY_CAPACITY: usize = 25;
/// Total payload size in bytes
pub const SEND_MANY_PAYLOAD_SIZE: usize = 1000;

const AMOUNTS_OFFSET: usize = SEND_MANY_CAPACITY * 32;

/// One transfer in a send-many payload.
#[derive(Debug, Clone)]
pub struct SendManyTransfer {
    /// Destination identity
    pub destination: Identity,
    /// Amount in base units (signed on the wire)
    pub amount: i64,
}

/// Encode up to 25 transfers into the fixed payload.
pub fn encode_send_many(transfers: &[SendManyTransfer]) -> Result<Vec<u8>, SdkError> {
    if transfers.len() > SEND_MANY_CAPACITY {
        return Err(SdkError::TooManyTransfers {
            max: SEND_MANY_CAPACITY,
            got: transfers.len(),
        });
    }

    let mut payload = vec![0u8; SEND_MANY_PAYLOAD_SIZE];
    for (slot, transfer) in transfers.iter().enumerate() {
        let public_key = fugue_crypto::public_key_from_identity(&transfer.destination)?;
        payload[slot * 32..slot * 32 + 32].copy_from_slice(public_key.as_bytes());
        payload[AMOUNTS_OFFSET + slot * 8..AMOUNTS_OFFSET + slot * 8 + 8]
            .copy_from_slice(&transfer.amount.to_le_bytes());
    }

    Ok(payload)
}

/// Decode the non-empty slots of a send-many payload.
///
/// The inverse of [`encode_send_many`], mainly for inspecting broadcast
/// payloads; a slot is non-empty when its public key is non-zero.
pub fn decode_send_many(payload: &[u8]) -> Result<Vec<SendManyTransfer>, SdkError> {
    if payload.len() != SEND_MANY_PAYLOAD_SIZE {
        return Err(SdkError::InputSizeMismatch {
            expected: SEND_MANY_PAYLOAD_SIZE as u32,
            actual: payload.len(),
        });
    }

    let mut transfers = Vec::new();
    for slot in 0..SEND_MANY_CAPACITY {
        let key_bytes: [u8; 32] = payload[slot * 32..slot * 32 + 32].try_into().expect("32-byte slot");
        if key_bytes == [0u8; 32] {
            continue;
        }
        let amount = i64::from_le_bytes(
            payload[AMOUNTS_OFFSET + slot * 8..AMOUNTS_OFFSET + slot * 8 + 8]
                .try_into()
                .expect("8-byte slot"),
        );
        let public_key = fugue_primitives::PublicKey::from_bytes(key_bytes);
        transfers.push(SendManyTransfer {
            destination: fugue_crypto::identity_from_public_key(&public_key),
            amount,
        });
    }

    Ok(transfers)
}
