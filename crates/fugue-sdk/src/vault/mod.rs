//! Passphrase-encrypted seed vault
//!
//! A small JSON document of named seeds, each encrypted under a key derived
//! from the vault passphrase. Two flavors share the format and every
//! invariant:
//!
//! - the **file vault** (scrypt KDF) persists to a path with atomic
//!   tmp+rename writes and an advisory `.lock` file;
//! - the **store-backed vault** (PBKDF2-SHA256 KDF) persists through a
//!   pluggable [`VaultStore`].
//!
//! Entry references resolve by exact name first, then by identity.

mod format;
mod lock;
mod store;

pub use format::{
    decrypt_seed, encrypt_seed, EncryptedSeed, KdfConfig, KdfParams, VaultEntry, VaultFile,
    VaultKey, KDF_PBKDF2, KDF_SCRYPT, VAULT_VERSION,
};
pub use lock::{install_exit_handler, release_all_locks, VaultLock};
pub use store::{MemoryVaultStore, VaultStore};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fugue_primitives::Identity;
use parking_lot::Mutex;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::tx_builder::SeedSource;
use crate::SdkError;

/// Options for opening a file vault.
#[derive(Debug, Clone)]
pub struct VaultOpenOptions {
    /// Vault file path
    pub path: PathBuf,
    /// Vault passphrase
    pub passphrase: String,
    /// Initialize an empty vault when the file is missing
    pub create: bool,
    /// KDF configuration for newly created vaults
    pub kdf: Option<KdfConfig>,
    /// Take the advisory `.lock` file
    pub lock: bool,
    /// How long to wait for a contended lock
    pub lock_timeout: Duration,
    /// Persist automatically after every mutation
    pub auto_save: bool,
}

impl VaultOpenOptions {
    /// Defaults: lock taken with zero wait, auto-save on.
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
            create: false,
            kdf: None,
            lock: true,
            lock_timeout: Duration::ZERO,
            auto_save: true,
        }
    }

    /// Create the vault when missing.
    pub fn create(mut self) -> Self {
        self.create = true;
        self
    }

    /// Skip the advisory lock.
    pub fn no_lock(mut self) -> Self {
        self.lock = false;
        self
    }

    /// Wait up to this long for a contended lock.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Disable automatic persistence; callers save explicitly.
    pub fn manual_save(mut self) -> Self {
        self.auto_save = false;
        self
    }
}

/// Options for opening a store-backed vault.
pub struct StoreOpenOptions {
    /// Backing store
    pub store: Arc<dyn VaultStore>,
    /// Vault passphrase
    pub passphrase: String,
    /// Initialize an empty vault when the store is empty
    pub create: bool,
    /// KDF configuration for newly created vaults
    pub kdf: Option<KdfConfig>,
    /// Persist automatically after every mutation
    pub auto_save: bool,
}

impl StoreOpenOptions {
    /// Defaults: auto-save on.
    pub fn new(store: Arc<dyn VaultStore>, passphrase: impl Into<String>) -> Self {
        Self {
            store,
            passphrase: passphrase.into(),
            create: false,
            kdf: None,
            auto_save: true,
        }
    }

    /// Create the vault when the store is empty.
    pub fn create(mut self) -> Self {
        self.create = true;
        self
    }
}

/// Arguments for adding a seed.
#[derive(Debug, Clone)]
pub struct AddSeed {
    /// Entry name
    pub name: String,
    /// The seed text
    pub seed: String,
    /// Subseed index to derive the identity with
    pub seed_index: u32,
    /// Replace an existing entry with the same name
    pub overwrite: bool,
}

impl AddSeed {
    /// Add under index 0, without overwrite.
    pub fn new(name: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: seed.into(),
            seed_index: 0,
            overwrite: false,
        }
    }

    /// Use a different subseed index.
    pub fn seed_index(mut self, index: u32) -> Self {
        self.seed_index = index;
        self
    }

    /// Allow replacing an existing entry.
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

/// How an encrypted import treats existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Keep existing entries; imported names win on collision
    Merge,
    /// Drop every existing entry first
    Replace,
}

/// Options for importing an encrypted vault export.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Merge or replace
    pub mode: ImportMode,
    /// Passphrase of the exporting vault; defaults to this vault's own
    pub source_passphrase: Option<String>,
}

enum Backend {
    File { path: PathBuf },
    Store { store: Arc<dyn VaultStore> },
}

impl Backend {
    fn load(&self) -> Result<Option<String>, SdkError> {
        match self {
            Backend::File { path } => match std::fs::read_to_string(path) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            Backend::Store { store } => store.read(),
        }
    }

    fn persist(&self, contents: &str) -> Result<(), SdkError> {
        match self {
            Backend::File { path } => {
                // Atomic write: temporary file in place, then rename.
                let tmp = path.with_extension("tmp");
                std::fs::write(&tmp, contents)?;
                std::fs::rename(&tmp, path)?;
                Ok(())
            }
            Backend::Store { store } => store.write(contents),
        }
    }

    fn describe(&self) -> String {
        match self {
            Backend::File { path } => path.display().to_string(),
            Backend::Store { .. } => "<store>".to_string(),
        }
    }
}

struct VaultInner {
    backend: Backend,
    kdf: KdfConfig,
    key: VaultKey,
    passphrase: Zeroizing<String>,
    entries: Vec<VaultEntry>,
    lock: Option<VaultLock>,
    auto_save: bool,
    closed: bool,
}

/// An open seed vault.
pub struct SeedVault {
    inner: Mutex<VaultInner>,
}

impl std::fmt::Debug for SeedVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedVault").finish_non_exhaustive()
    }
}

impl SeedVault {
    /// Open (or create) a file vault.
    pub async fn open(options: VaultOpenOptions) -> Result<Arc<Self>, SdkError> {
        let lock = if options.lock {
            Some(VaultLock::acquire(&options.path, options.lock_timeout).await?)
        } else {
            None
        };

        let backend = Backend::File {
            path: options.path.clone(),
        };
        Self::open_inner(
            backend,
            &options.passphrase,
            options.create,
            options.kdf.unwrap_or_else(KdfConfig::scrypt_default),
            lock,
            options.auto_save,
        )
    }

    /// Open (or create) a store-backed vault.
    pub fn open_store(options: StoreOpenOptions) -> Result<Arc<Self>, SdkError> {
        let backend = Backend::Store {
            store: options.store.clone(),
        };
        Self::open_inner(
            backend,
            &options.passphrase,
            options.create,
            options.kdf.unwrap_or_else(KdfConfig::pbkdf2_default),
            None,
            options.auto_save,
        )
    }

    fn open_inner(
        backend: Backend,
        passphrase: &str,
        create: bool,
        create_kdf: KdfConfig,
        lock: Option<VaultLock>,
        auto_save: bool,
    ) -> Result<Arc<Self>, SdkError> {
        let (kdf, entries, fresh) = match backend.load()? {
            Some(contents) => {
                let file = VaultFile::parse(&contents)?;
                (file.kdf, file.entries, false)
            }
            None if create => (create_kdf, Vec::new(), true),
            None => return Err(SdkError::VaultNotFound(backend.describe())),
        };

        let key = kdf.derive_key(passphrase)?;

        // The document itself carries no verifier; the first entry's GCM tag
        // authenticates the passphrase.
        if let Some(entry) = entries.first() {
            decrypt_seed(&key, &entry.encrypted)?;
        }

        let inner = VaultInner {
            backend,
            kdf,
            key,
            passphrase: Zeroizing::new(passphrase.to_string()),
            entries,
            lock,
            auto_save,
            closed: false,
        };

        if fresh {
            persist(&inner)?;
        }

        Ok(Arc::new(Self {
            inner: Mutex::new(inner),
        }))
    }

    // ==================== Reads ====================

    /// All entries (encrypted form), in insertion order.
    pub fn list(&self) -> Result<Vec<VaultEntry>, SdkError> {
        let inner = self.inner.lock();
        ensure_open(&inner)?;
        Ok(inner.entries.clone())
    }

    /// Look up one entry by name or identity.
    pub fn get_entry(&self, reference: &str) -> Result<VaultEntry, SdkError> {
        let inner = self.inner.lock();
        ensure_open(&inner)?;
        let index = resolve(&inner, reference)?;
        Ok(inner.entries[index].clone())
    }

    /// The identity stored for an entry (derived at insertion time).
    pub fn get_identity(&self, reference: &str) -> Result<Identity, SdkError> {
        Ok(self.get_entry(reference)?.identity)
    }

    /// Decrypt and return an entry's seed.
    pub fn get_seed(&self, reference: &str) -> Result<Zeroizing<String>, SdkError> {
        let inner = self.inner.lock();
        ensure_open(&inner)?;
        let index = resolve(&inner, reference)?;
        decrypt_seed(&inner.key, &inner.entries[index].encrypted)
    }

    /// A [`SeedSource`] that resolves through this vault at build time.
    pub fn signer(self: &Arc<Self>, reference: &str) -> Result<SeedSource, SdkError> {
        let entry = self.get_entry(reference)?;
        Ok(SeedSource::Vault {
            vault: self.clone(),
            entry: entry.name,
        })
    }

    /// A [`SeedSource`] carrying the decrypted seed itself.
    pub fn seed_source(&self, reference: &str) -> Result<SeedSource, SdkError> {
        let seed = self.get_seed(reference)?;
        Ok(SeedSource::Seed(seed.as_str().to_string()))
    }

    // ==================== Mutations ====================

    /// Add (or overwrite) a named seed. Returns the derived identity.
    pub fn add_seed(&self, add: AddSeed) -> Result<Identity, SdkError> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;

        let identity = fugue_crypto::identity_from_seed(&add.seed, add.seed_index)?;
        let encrypted = encrypt_seed(&inner.key, &add.seed)?;
        let now = unix_now();

        match inner.entries.iter().position(|e| e.name == add.name) {
            Some(_) if !add.overwrite => {
                return Err(SdkError::VaultEntryExists(add.name));
            }
            Some(index) => {
                let created_at = inner.entries[index].created_at;
                inner.entries[index] = VaultEntry {
                    name: add.name,
                    identity: identity.clone(),
                    seed_index: add.seed_index,
                    created_at,
                    updated_at: now,
                    encrypted,
                };
            }
            None => {
                inner.entries.push(VaultEntry {
                    name: add.name,
                    identity: identity.clone(),
                    seed_index: add.seed_index,
                    created_at: now,
                    updated_at: now,
                    encrypted,
                });
            }
        }

        autosave(&inner)?;
        Ok(identity)
    }

    /// Remove an entry by name or identity.
    pub fn remove(&self, reference: &str) -> Result<(), SdkError> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;
        let index = resolve(&inner, reference)?;
        inner.entries.remove(index);
        autosave(&inner)?;
        Ok(())
    }

    /// Re-encrypt every entry under a new passphrase. All-or-nothing: any
    /// decryption failure leaves the vault untouched.
    pub fn rotate_passphrase(&self, new_passphrase: &str) -> Result<(), SdkError> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;

        let seeds: Vec<Zeroizing<String>> = inner
            .entries
            .iter()
            .map(|entry| decrypt_seed(&inner.key, &entry.encrypted))
            .collect::<Result<_, _>>()?;

        let new_kdf = inner.kdf.resalted();
        let new_key = new_kdf.derive_key(new_passphrase)?;

        let reencrypted: Vec<EncryptedSeed> = seeds
            .iter()
            .map(|seed| encrypt_seed(&new_key, seed))
            .collect::<Result<_, _>>()?;

        let now = unix_now();
        for (entry, encrypted) in inner.entries.iter_mut().zip(reencrypted) {
            entry.encrypted = encrypted;
            entry.updated_at = now;
        }
        inner.kdf = new_kdf;
        inner.key = new_key;
        inner.passphrase = Zeroizing::new(new_passphrase.to_string());

        autosave(&inner)?;
        Ok(())
    }

    // ==================== Export / import ====================

    /// The full vault document, still encrypted.
    pub fn export_encrypted(&self) -> Result<String, SdkError> {
        let inner = self.inner.lock();
        ensure_open(&inner)?;
        document(&inner).to_pretty_json()
    }

    /// Decrypted export. Handle with care; the result holds plaintext seeds.
    pub fn export_json(&self) -> Result<String, SdkError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PlainEntry {
            name: String,
            identity: Identity,
            seed_index: u32,
            seed: String,
        }

        let inner = self.inner.lock();
        ensure_open(&inner)?;

        let entries = inner
            .entries
            .iter()
            .map(|entry| {
                decrypt_seed(&inner.key, &entry.encrypted).map(|seed| PlainEntry {
                    name: entry.name.clone(),
                    identity: entry.identity.clone(),
                    seed_index: entry.seed_index,
                    seed: seed.as_str().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        serde_json::to_string_pretty(&serde_json::json!({ "entries": entries }))
            .map_err(SdkError::from)
    }

    /// Import an encrypted export. Returns the number of imported entries.
    pub fn import_encrypted(&self, blob: &str, options: ImportOptions) -> Result<usize, SdkError> {
        let mut inner = self.inner.lock();
        ensure_open(&inner)?;

        let file = VaultFile::parse(blob)?;
        let source_passphrase = options
            .source_passphrase
            .as_deref()
            .unwrap_or(inner.passphrase.as_str());
        let source_key = file.kdf.derive_key(source_passphrase)?;

        // Decrypt everything first so a bad passphrase cannot half-apply.
        let decrypted: Vec<(VaultEntry, Zeroizing<String>)> = file
            .entries
            .into_iter()
            .map(|entry| {
                decrypt_seed(&source_key, &entry.encrypted).map(|seed| (entry, seed))
            })
            .collect::<Result<_, _>>()?;

        if options.mode == ImportMode::Replace {
            inner.entries.clear();
        }

        let count = decrypted.len();
        for (mut entry, seed) in decrypted {
            entry.encrypted = encrypt_seed(&inner.key, &seed)?;
            match inner.entries.iter().position(|e| e.name == entry.name) {
                Some(index) => inner.entries[index] = entry,
                None => inner.entries.push(entry),
            }
        }

        autosave(&inner)?;
        Ok(count)
    }

    // ==================== Persistence ====================

    /// Persist the vault now.
    pub fn save(&self) -> Result<(), SdkError> {
        let inner = self.inner.lock();
        ensure_open(&inner)?;
        persist(&inner)
    }

    /// Persist (when auto-save is on), release the lock and refuse further
    /// operations.
    pub fn close(&self) -> Result<(), SdkError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        if inner.auto_save {
            persist(&inner)?;
        }
        if let Some(mut lock) = inner.lock.take() {
            lock.release();
        }
        inner.closed = true;
        Ok(())
    }
}

fn ensure_open(inner: &VaultInner) -> Result<(), SdkError> {
    if inner.closed {
        return Err(SdkError::Vault("vault is closed".to_string()));
    }
    Ok(())
}

fn resolve(inner: &VaultInner, reference: &str) -> Result<usize, SdkError> {
    // Exact name match wins; identity scan second.
    if let Some(index) = inner.entries.iter().position(|e| e.name == reference) {
        return Ok(index);
    }
    inner
        .entries
        .iter()
        .position(|e| e.identity.as_str() == reference)
        .ok_or_else(|| SdkError::VaultEntryNotFound(reference.to_string()))
}

fn document(inner: &VaultInner) -> VaultFile {
    VaultFile {
        vault_version: VAULT_VERSION,
        kdf: inner.kdf.clone(),
        entries: inner.entries.clone(),
    }
}

fn persist(inner: &VaultInner) -> Result<(), SdkError> {
    let contents = document(inner).to_pretty_json()?;
    inner.backend.persist(&contents)
}

fn autosave(inner: &VaultInner) -> Result<(), SdkError> {
    if inner.auto_save {
        persist(inner)?;
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
