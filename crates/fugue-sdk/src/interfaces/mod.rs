//! Contract interface registry
//!
//! Interface files describe a contract's entry points declaratively:
//! functions (read-only queries against the live surface) and procedures
//! (state-changing transactions sent to the contract's identity). The
//! registry indexes the files by contract name and index, and validates any
//! supplied codecs against the declared entries before the first call.

mod codec;
mod exchange;
mod handle;
mod layout;

pub use codec::{CodecError, CodecRegistry, ContractCodec};
pub use exchange::{exchange_codecs, exchange_interface};
pub use handle::{ContractHandle, ContractQueryResult, ProcedureCall, QueryCall};
pub use layout::{FieldType, LayoutCodec};

use std::collections::HashMap;
use std::sync::Arc;

use fugue_primitives::Identity;
use serde::{Deserialize, Serialize};

use crate::SdkError;

/// Whether an entry reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Read-only query, served by the live surface
    Function,
    /// State-changing call, carried by a transaction
    Procedure,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Function => f.write_str("function"),
            EntryKind::Procedure => f.write_str("procedure"),
        }
    }
}

/// One declared entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceEntry {
    /// Function or procedure
    pub kind: EntryKind,
    /// Entry name, unique per (contract, kind)
    pub name: String,
    /// Input type carried on the wire
    pub input_type: u16,
    /// Exact input size in bytes, when the entry declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_size: Option<u32>,
    /// Expected output size in bytes, when the entry declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u32>,
}

/// Addressing block of an interface file.
///
/// A function query requires `contract_index`; a procedure transaction
/// requires at least one of `contract_id` / `contract_public_key_hex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDescriptor {
    /// Contract name, unique across the registry
    pub name: String,
    /// Index on the live surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_index: Option<u32>,
    /// The contract's 32-byte public key, hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_public_key_hex: Option<String>,
    /// The contract's identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<Identity>,
}

/// A declarative contract interface: descriptor plus entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceFile {
    /// The contract this file describes
    pub contract: ContractDescriptor,
    /// Declared entry points
    pub entries: Vec<InterfaceEntry>,
}

impl InterfaceFile {
    /// Parse an interface file from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SdkError> {
        serde_json::from_str(text).map_err(SdkError::from)
    }

    /// Find an entry by kind and name (linear scan; files are small).
    pub fn entry(&self, kind: EntryKind, name: &str) -> Option<&InterfaceEntry> {
        self.entries.iter().find(|e| e.kind == kind && e.name == name)
    }
}

/// Immutable in-memory index of interface files.
pub struct InterfaceRegistry {
    by_name: HashMap<String, Arc<InterfaceFile>>,
    by_index: HashMap<u32, Arc<InterfaceFile>>,
    codecs: HashMap<String, Arc<CodecRegistry>>,
}

impl std::fmt::Debug for InterfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceRegistry").finish_non_exhaustive()
    }
}

impl InterfaceRegistry {
    /// Build a registry from interface files, without codecs.
    pub fn new(files: Vec<InterfaceFile>) -> Result<Self, SdkError> {
        Self::with_codecs(files, HashMap::new())
    }

    /// Build a registry from interface files and per-contract codecs.
    ///
    /// Fails on duplicate contract names, duplicate contract indexes, and on
    /// any codec naming an entry its interface does not declare — all before
    /// the first call.
    pub fn with_codecs(
        files: Vec<InterfaceFile>,
        codecs: HashMap<String, CodecRegistry>,
    ) -> Result<Self, SdkError> {
        let mut by_name = HashMap::new();
        let mut by_index = HashMap::new();

        for file in files {
            let name = file.contract.name.clone();
            let file = Arc::new(file);

            if by_name.insert(name.clone(), file.clone()).is_some() {
                return Err(SdkError::CodecValidation(format!(
                    "duplicate contract name {name:?}"
                )));
            }
            if let Some(index) = file.contract.contract_index {
                if by_index.insert(index, file.clone()).is_some() {
                    return Err(SdkError::CodecValidation(format!(
                        "duplicate contract index {index}"
                    )));
                }
            }
        }

        let mut validated = HashMap::new();
        for (contract_name, registry) in codecs {
            let file = by_name.get(&contract_name).ok_or_else(|| {
                SdkError::CodecValidation(format!(
                    "codec registry names unknown contract {contract_name:?}"
                ))
            })?;
            for (kind, entry_name) in registry.keys() {
                if file.entry(kind, &entry_name).is_none() {
                    return Err(SdkError::CodecValidation(format!(
                        "codec for {kind} {entry_name:?} has no matching entry on contract {contract_name:?}"
                    )));
                }
            }
            validated.insert(contract_name, Arc::new(registry));
        }

        Ok(Self {
            by_name,
            by_index,
            codecs: validated,
        })
    }

    /// Look up a contract by name.
    pub fn by_name(&self, name: &str) -> Option<&Arc<InterfaceFile>> {
        self.by_name.get(name)
    }

    /// Look up a contract by live-surface index.
    pub fn by_index(&self, index: u32) -> Option<&Arc<InterfaceFile>> {
        self.by_index.get(&index)
    }

    /// The codec registry configured for a contract, if any.
    pub fn codecs_for(&self, name: &str) -> Option<&Arc<CodecRegistry>> {
        self.codecs.get(name)
    }

    /// Names of all registered contracts.
    pub fn contract_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}
