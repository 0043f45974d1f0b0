//! Pluggable persistence for store-backed vaults
//!
//! Embedders (browser-style environments, keychains, databases) supply a
//! `VaultStore` instead of a file path. The vault document format and every
//! invariant are identical to the file vault; only the KDF family differs.

use parking_lot::Mutex;

use crate::SdkError;

/// Pluggable backing storage for a vault document.
pub trait VaultStore: Send + Sync {
    /// Read the stored document, if any.
    fn read(&self) -> Result<Option<String>, SdkError>;

    /// Write (replace) the stored document.
    fn write(&self, contents: &str) -> Result<(), SdkError>;

    /// Remove the stored document. Optional; defaults to a no-op.
    fn remove(&self) -> Result<(), SdkError> {
        Ok(())
    }
}

/// In-memory store (tests, ephemeral vaults).
#[derive(Default)]
pub struct MemoryVaultStore {
    contents: Mutex<Option<String>>,
}

impl MemoryVaultStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw contents, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl VaultStore for MemoryVaultStore {
    fn read(&self) -> Result<Option<String>, SdkError> {
        Ok(self.contents.lock().clone())
    }

    fn write(&self, contents: &str) -> Result<(), SdkError> {
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), SdkError> {
        *self.contents.lock() = None;
        Ok(())
    }
}
