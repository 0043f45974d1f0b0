//! Vault file format (version 1)
//!
//! ```text
//! { vaultVersion, kdf: { name, params: { ..., saltBase64 } },
//!   entries: [ { name, identity, seedIndex, createdAt, updatedAt,
//!               encrypted: { nonceBase64, ciphertextBase64, tagBase64 } } ] }
//! ```
//!
//! Seeds are encrypted with AES-256-GCM (96-bit nonce, 128-bit tag) under a
//! key derived from the passphrase: scrypt for file vaults, PBKDF2-SHA256
//! for store-backed vaults. Unknown versions are refused.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use fugue_primitives::Identity;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::SdkError;

/// The only supported vault file version
pub const VAULT_VERSION: u32 = 1;

/// KDF family for file vaults
pub const KDF_SCRYPT: &str = "scrypt";
/// KDF family for store-backed vaults
pub const KDF_PBKDF2: &str = "pbkdf2-sha256";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const SALT_LEN: usize = 32;

const DEFAULT_SCRYPT_N: u32 = 1 << 13;
const DEFAULT_SCRYPT_R: u32 = 8;
const DEFAULT_SCRYPT_P: u32 = 1;
const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// A derived vault encryption key, zeroized on drop.
pub type VaultKey = Zeroizing<[u8; 32]>;

/// KDF parameters; scrypt uses `n`/`r`/`p`, PBKDF2 uses `iterations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// scrypt cost parameter (power of two)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// scrypt block size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<u32>,
    /// scrypt parallelization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<u32>,
    /// PBKDF2 iteration count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Derived key length in bytes
    pub dk_len: u32,
    /// Salt, base64
    pub salt_base64: String,
}

/// KDF family plus parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Family name: `scrypt` or `pbkdf2-sha256`
    pub name: String,
    /// Family parameters
    pub params: KdfParams,
}

fn fresh_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    base64::engine::general_purpose::STANDARD.encode(salt)
}

impl KdfConfig {
    /// Default scrypt configuration (N=2^13, r=8, p=1) with a fresh salt.
    pub fn scrypt_default() -> Self {
        Self {
            name: KDF_SCRYPT.to_string(),
            params: KdfParams {
                n: Some(DEFAULT_SCRYPT_N),
                r: Some(DEFAULT_SCRYPT_R),
                p: Some(DEFAULT_SCRYPT_P),
                iterations: None,
                dk_len: KEY_LEN as u32,
                salt_base64: fresh_salt(),
            },
        }
    }

    /// Default PBKDF2-SHA256 configuration (200 000 iterations) with a
    /// fresh salt.
    pub fn pbkdf2_default() -> Self {
        Self {
            name: KDF_PBKDF2.to_string(),
            params: KdfParams {
                n: None,
                r: None,
                p: None,
                iterations: Some(DEFAULT_PBKDF2_ITERATIONS),
                dk_len: KEY_LEN as u32,
                salt_base64: fresh_salt(),
            },
        }
    }

    /// The same family with a fresh salt (passphrase rotation).
    pub fn resalted(&self) -> Self {
        let mut config = self.clone();
        config.params.salt_base64 = fresh_salt();
        config
    }

    /// Derive the encryption key from a passphrase.
    pub fn derive_key(&self, passphrase: &str) -> Result<VaultKey, SdkError> {
        if self.params.dk_len as usize != KEY_LEN {
            return Err(SdkError::Vault(format!(
                "unsupported dkLen {}, expected {KEY_LEN}",
                self.params.dk_len
            )));
        }
        let salt = base64::engine::general_purpose::STANDARD
            .decode(self.params.salt_base64.as_bytes())
            .map_err(|e| SdkError::Vault(format!("invalid KDF salt: {e}")))?;

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        match self.name.as_str() {
            KDF_SCRYPT => {
                let n = self.params.n.unwrap_or(DEFAULT_SCRYPT_N);
                if !n.is_power_of_two() || n < 2 {
                    return Err(SdkError::Vault(format!("scrypt N {n} is not a power of two")));
                }
                let params = scrypt::Params::new(
                    n.trailing_zeros() as u8,
                    self.params.r.unwrap_or(DEFAULT_SCRYPT_R),
                    self.params.p.unwrap_or(DEFAULT_SCRYPT_P),
                    KEY_LEN,
                )
                .map_err(|e| SdkError::Vault(format!("invalid scrypt params: {e}")))?;
                scrypt::scrypt(passphrase.as_bytes(), &salt, &params, key.as_mut())
                    .map_err(|e| SdkError::Vault(format!("scrypt failed: {e}")))?;
            }
            KDF_PBKDF2 => {
                let iterations = self.params.iterations.unwrap_or(DEFAULT_PBKDF2_ITERATIONS);
                pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
                    passphrase.as_bytes(),
                    &salt,
                    iterations,
                    key.as_mut(),
                );
            }
            other => {
                return Err(SdkError::Vault(format!("unsupported KDF {other:?}")));
            }
        }
        Ok(key)
    }
}

/// Encrypted seed material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSeed {
    /// 96-bit nonce, base64
    pub nonce_base64: String,
    /// Ciphertext, base64
    pub ciphertext_base64: String,
    /// 128-bit authentication tag, base64
    pub tag_base64: String,
}

/// Encrypt a seed under the vault key with a fresh random nonce.
pub fn encrypt_seed(key: &VaultKey, seed: &str) -> Result<EncryptedSeed, SdkError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| SdkError::Vault(format!("cipher init failed: {e}")))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), seed.as_bytes())
        .map_err(|e| SdkError::Vault(format!("encryption failed: {e}")))?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    let b64 = base64::engine::general_purpose::STANDARD;
    Ok(EncryptedSeed {
        nonce_base64: b64.encode(nonce),
        ciphertext_base64: b64.encode(&sealed),
        tag_base64: b64.encode(&tag),
    })
}

/// Decrypt a seed. Authentication failure means the passphrase (or the
/// file) is wrong.
pub fn decrypt_seed(key: &VaultKey, encrypted: &EncryptedSeed) -> Result<Zeroizing<String>, SdkError> {
    let b64 = base64::engine::general_purpose::STANDARD;
    let nonce = b64
        .decode(encrypted.nonce_base64.as_bytes())
        .map_err(|e| SdkError::Vault(format!("invalid nonce: {e}")))?;
    if nonce.len() != NONCE_LEN {
        return Err(SdkError::Vault(format!("invalid nonce length {}", nonce.len())));
    }
    let mut sealed = b64
        .decode(encrypted.ciphertext_base64.as_bytes())
        .map_err(|e| SdkError::Vault(format!("invalid ciphertext: {e}")))?;
    let tag = b64
        .decode(encrypted.tag_base64.as_bytes())
        .map_err(|e| SdkError::Vault(format!("invalid tag: {e}")))?;
    sealed.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| SdkError::Vault(format!("cipher init failed: {e}")))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
        .map_err(|_| SdkError::VaultInvalidPassphrase)?;

    String::from_utf8(plaintext)
        .map(Zeroizing::new)
        .map_err(|_| SdkError::Vault("decrypted seed is not UTF-8".to_string()))
}

/// One named seed in the vault. The identity is derived once at insertion
/// and never re-derived on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    /// Entry name, unique in the vault
    pub name: String,
    /// Identity derived from the seed at insertion time
    pub identity: Identity,
    /// Subseed index the identity was derived with
    pub seed_index: u32,
    /// Creation time, unix seconds
    pub created_at: u64,
    /// Last update time, unix seconds
    pub updated_at: u64,
    /// The encrypted seed
    pub encrypted: EncryptedSeed,
}

/// The on-disk vault document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultFile {
    /// Format version; must be [`VAULT_VERSION`]
    pub vault_version: u32,
    /// Key derivation configuration
    pub kdf: KdfConfig,
    /// Stored entries
    pub entries: Vec<VaultEntry>,
}

impl VaultFile {
    /// Parse and version-check a vault document.
    pub fn parse(contents: &str) -> Result<Self, SdkError> {
        let file: VaultFile = serde_json::from_str(contents)
            .map_err(|e| SdkError::Vault(format!("unreadable vault file: {e}")))?;
        if file.vault_version != VAULT_VERSION {
            return Err(SdkError::Vault(format!(
                "unsupported vault version {}",
                file.vault_version
            )));
        }
        Ok(file)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_pretty_json(&self) -> Result<String, SdkError> {
        serde_json::to_string_pretty(self).map_err(SdkError::from)
    }
}
