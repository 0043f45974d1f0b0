//! Typed codecs for interface entries
//!
//! Codec inputs and outputs are erased to `serde_json::Value`; typed callers
//! convert at the edge. Codec failures are always wrapped into the SDK's
//! codec error kind so foreign error types never cross the API boundary.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use serde_json::Value;

use super::{EntryKind, InterfaceEntry};
use crate::SdkError;

/// Boxed error returned by user codecs.
pub type CodecError = Box<dyn Error + Send + Sync>;

/// Encode/decode routines for specific interface entries.
pub trait ContractCodec: Send + Sync {
    /// Encode an input value into entry input bytes.
    fn encode(&self, entry: &InterfaceEntry, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Decode entry output bytes into a value.
    fn decode(&self, entry: &InterfaceEntry, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Wrap a codec failure into the SDK error kind.
pub(crate) fn wrap_codec_error(
    operation: &'static str,
    entry: &InterfaceEntry,
    error: CodecError,
) -> SdkError {
    SdkError::Codec {
        operation,
        entry: entry.name.clone(),
        message: error.to_string(),
    }
}

/// Per-contract codec table, keyed by entry kind and name.
#[derive(Default)]
pub struct CodecRegistry {
    entries: HashMap<(EntryKind, String), Arc<dyn ContractCodec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec for one entry; builder-style.
    pub fn with(mut self, kind: EntryKind, name: impl Into<String>, codec: Arc<dyn ContractCodec>) -> Self {
        self.entries.insert((kind, name.into()), codec);
        self
    }

    /// Register a codec for one entry.
    pub fn register(&mut self, kind: EntryKind, name: impl Into<String>, codec: Arc<dyn ContractCodec>) {
        self.entries.insert((kind, name.into()), codec);
    }

    /// Codec for an entry, if registered.
    pub fn get(&self, kind: EntryKind, name: &str) -> Option<&Arc<dyn ContractCodec>> {
        self.entries.get(&(kind, name.to_string()))
    }

    /// All (kind, name) keys, for registry-construction validation.
    pub(crate) fn keys(&self) -> Vec<(EntryKind, String)> {
        self.entries.keys().cloned().collect()
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no codecs are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
