//! # fugue-primitives
//!
//! Primitive types for the Fugue ledger.
//!
//! This crate provides the fundamental data types used throughout the SDK.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod identity;
mod pubkey;
mod tick;

pub use error::PrimitiveError;
pub use identity::Identity;
pub use pubkey::PublicKey;
pub use tick::Tick;

/// Epoch number type
pub type Epoch = u32;
