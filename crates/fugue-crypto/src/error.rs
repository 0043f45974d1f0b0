//! Crypto error types

use thiserror::Error;

/// Errors from key derivation, the identity codec, and transaction signing
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Identity failed structural validation
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Identity checksum did not match its public key
    #[error("identity checksum mismatch")]
    ChecksumMismatch,

    /// Seed is unusable for derivation
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Transaction input payload exceeds the wire limit
    #[error("transaction input too large: {0} bytes exceeds {max}", max = u16::MAX)]
    InputTooLarge(usize),
}
