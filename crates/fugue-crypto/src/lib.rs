//! # fugue-crypto
//!
//! Cryptographic primitives for the Fugue ledger:
//!
//! - seed → keypair derivation (Ed25519 over Keccak-256 subseeds)
//! - the 60-character identity codec for 32-byte public keys
//! - transaction wire encoding, signing and id hashing
//!
//! The SDK treats this crate as a trusted collaborator; everything here is
//! deterministic so that transaction builds are reproducible.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
mod error;
mod hash;
mod seed;
mod tx;

pub use codec::{identity_from_public_key, public_key_from_identity};
pub use error::CryptoError;
pub use hash::keccak256;
pub use seed::{
    identity_from_seed, private_key_from_seed, public_key_from_seed, subseed, PrivateKey,
};
pub use tx::{build_signed_transaction, transaction_id, TxHeader, SIGNATURE_LEN};
