//! Textual ledger identity (60 uppercase characters)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PrimitiveError;

/// A ledger identity: the human-readable 60-character encoding of a
/// 32-byte public key.
///
/// `Identity` only validates the textual form (length and alphabet); the
/// conversion to and from public keys lives in `fugue-crypto`, which owns
/// the checksum rules.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Length of the textual form in characters
    pub const LEN: usize = 60;

    /// Parse an identity from its textual form.
    pub fn parse(s: &str) -> Result<Self, PrimitiveError> {
        if s.len() != Self::LEN {
            return Err(PrimitiveError::IdentityLength(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_uppercase()) {
            return Err(PrimitiveError::IdentityAlphabet(c));
        }
        Ok(Identity(s.to_string()))
    }

    /// Construct without validation.
    ///
    /// Only for codec output that is uppercase A-Z by construction.
    pub fn from_raw_unchecked(s: String) -> Self {
        debug_assert_eq!(s.len(), Self::LEN);
        Identity(s)
    }

    /// The textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = PrimitiveError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Identity::parse(&s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> String {
        id.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
