//! Primitive parsing errors

use thiserror::Error;

/// Errors produced when parsing primitive types
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Identity has the wrong length
    #[error("invalid identity length: expected 60 characters, got {0}")]
    IdentityLength(usize),

    /// Identity contains characters outside A-Z
    #[error("invalid identity character {0:?}: identities use uppercase A-Z only")]
    IdentityAlphabet(char),

    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Public key has the wrong length
    #[error("invalid public key length: expected 32 bytes, got {0}")]
    PublicKeyLength(usize),

    /// Tick does not fit the wire width
    #[error("tick {0} does not fit in 32 bits")]
    TickRange(u64),
}
