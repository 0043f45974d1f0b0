//! Transaction builder

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use fugue_crypto::TxHeader;
use fugue_primitives::{Identity, Tick};
use zeroize::Zeroizing;

use crate::vault::SeedVault;
use crate::SdkError;

/// Where the signing seed comes from.
#[derive(Clone)]
pub enum SeedSource {
    /// An inline seed
    Seed(String),
    /// A named entry in an open vault; the seed is resolved at build time
    /// and never cached
    Vault {
        /// The open vault
        vault: Arc<SeedVault>,
        /// Entry reference (name or identity)
        entry: String,
    },
}

impl SeedSource {
    pub(crate) fn resolve(&self) -> Result<Zeroizing<String>, SdkError> {
        match self {
            SeedSource::Seed(seed) => Ok(Zeroizing::new(seed.clone())),
            SeedSource::Vault { vault, entry } => vault.get_seed(entry),
        }
    }
}

impl fmt::Debug for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedSource::Seed(_) => f.write_str("SeedSource::Seed(..)"),
            SeedSource::Vault { entry, .. } => {
                f.debug_struct("SeedSource::Vault").field("entry", entry).finish()
            }
        }
    }
}

/// An immutable signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// The wire bytes
    pub bytes: Bytes,
    /// Deterministic id, hashed over `bytes`
    pub tx_id: String,
    /// The tick the transaction targets
    pub target_tick: Tick,
}

/// Transaction builder with fluent API.
///
/// ```rust,no_run
/// use fugue_sdk::TxBuilder;
/// use fugue_primitives::{Identity, Tick};
///
/// # fn demo(to: Identity) -> Result<(), fugue_sdk::SdkError> {
/// let signed = TxBuilder::new()
///     .source_seed("lzmmdcqlnqtwrbzgjrleipgbtzxtdkirmnmyvsyqevhlzejwtrcqcbcdxnf")
///     .to(to)
///     .amount(1)
///     .target_tick(Tick::new(12345))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    source: Option<SeedSource>,
    to: Option<Identity>,
    amount: u64,
    target_tick: Option<Tick>,
    input_type: u16,
    input: Vec<u8>,
}

impl TxBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign with an inline seed
    pub fn source_seed(mut self, seed: impl Into<String>) -> Self {
        self.source = Some(SeedSource::Seed(seed.into()));
        self
    }

    /// Sign with a vault entry
    pub fn source_vault(mut self, vault: Arc<SeedVault>, entry: impl Into<String>) -> Self {
        self.source = Some(SeedSource::Vault {
            vault,
            entry: entry.into(),
        });
        self
    }

    /// Sign with a prepared [`SeedSource`]
    pub fn source(mut self, source: SeedSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the destination identity
    pub fn to(mut self, identity: Identity) -> Self {
        self.to = Some(identity);
        self
    }

    /// Set the amount in base units
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    /// Set the target tick
    pub fn target_tick(mut self, tick: Tick) -> Self {
        self.target_tick = Some(tick);
        self
    }

    /// Set the contract input type (0 for plain transfers)
    pub fn input_type(mut self, input_type: u16) -> Self {
        self.input_type = input_type;
        self
    }

    /// Set the contract input payload
    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = input.into();
        self
    }

    /// The target tick currently set, if any.
    pub fn target_tick_value(&self) -> Option<Tick> {
        self.target_tick
    }

    /// Whether a target tick has been set.
    pub fn has_target_tick(&self) -> bool {
        self.target_tick.is_some()
    }

    /// The source identity of this builder, derived from its seed.
    pub fn source_identity(&self) -> Result<Identity, SdkError> {
        let seed = self
            .source
            .as_ref()
            .ok_or(SdkError::MissingField("source"))?
            .resolve()?;
        let public_key = fugue_crypto::public_key_from_seed(&seed)?;
        Ok(fugue_crypto::identity_from_public_key(&public_key))
    }

    /// Build and sign.
    ///
    /// Requires `source`, `to` and `target_tick` to be set; the façade
    /// resolves a suggested target tick before calling this when the caller
    /// left it out.
    pub fn build(&self) -> Result<SignedTransaction, SdkError> {
        let source = self.source.as_ref().ok_or(SdkError::MissingField("source"))?;
        let to = self.to.as_ref().ok_or(SdkError::MissingField("to"))?;
        let target_tick = self.target_tick.ok_or(SdkError::MissingField("target_tick"))?;

        let tick = target_tick
            .to_u32()
            .map_err(|_| SdkError::TickOutOfRange(target_tick.value()))?;

        let seed = source.resolve()?;
        let private_key = fugue_crypto::private_key_from_seed(&seed)?;
        let source_public_key = fugue_crypto::public_key_from_seed(&seed)?;
        let destination_public_key = fugue_crypto::public_key_from_identity(to)?;

        let header = TxHeader {
            source_public_key,
            destination_public_key,
            amount: self.amount,
            tick,
            input_type: self.input_type,
            input: self.input.clone(),
        };

        let bytes = fugue_crypto::build_signed_transaction(&header, &private_key)?;
        let tx_id = fugue_crypto::transaction_id(&bytes);

        Ok(SignedTransaction {
            bytes: Bytes::from(bytes),
            tx_id,
            target_tick,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "whpkgrcqlzsnmdgvxqybhtwmfcjrduexpfakeseedfixtureivnalzoqurtb";

    fn destination() -> Identity {
        let pk = fugue_crypto::public_key_from_seed("destinationseedfixture").unwrap();
        fugue_crypto::identity_from_public_key(&pk)
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = TxBuilder::new()
            .source_seed(SEED)
            .to(destination())
            .amount(1)
            .target_tick(Tick::new(12345));

        let a = builder.build().unwrap();
        let b = builder.build().unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.tx_id, b.tx_id);
        assert_eq!(a.target_tick, Tick::new(12345));
    }

    #[test]
    fn test_tx_id_matches_external_hasher() {
        let signed = TxBuilder::new()
            .source_seed(SEED)
            .to(destination())
            .amount(1)
            .target_tick(Tick::new(12345))
            .build()
            .unwrap();

        assert_eq!(signed.tx_id, fugue_crypto::transaction_id(&signed.bytes));
    }

    #[test]
    fn test_missing_fields() {
        let err = TxBuilder::new().to(destination()).target_tick(Tick::new(1)).build();
        assert!(matches!(err, Err(SdkError::MissingField("source"))));

        let err = TxBuilder::new().source_seed(SEED).target_tick(Tick::new(1)).build();
        assert!(matches!(err, Err(SdkError::MissingField("to"))));

        let err = TxBuilder::new().source_seed(SEED).to(destination()).build();
        assert!(matches!(err, Err(SdkError::MissingField("target_tick"))));
    }

    #[test]
    fn test_tick_range_check() {
        let err = TxBuilder::new()
            .source_seed(SEED)
            .to(destination())
            .target_tick(Tick::new(u64::from(u32::MAX) + 1))
            .build();
        assert!(matches!(err, Err(SdkError::TickOutOfRange(_))));
    }

    #[test]
    fn test_source_identity_matches_seed() {
        let builder = TxBuilder::new().source_seed(SEED);
        let identity = builder.source_identity().unwrap();
        let pk = fugue_crypto::public_key_from_seed(SEED).unwrap();
        assert_eq!(identity, fugue_crypto::identity_from_public_key(&pk));
    }
}
