//! SDK error taxonomy
//!
//! One process-global enum so calling code can match on failure kinds
//! without knowing which subsystem produced them.

use fugue_primitives::Tick;
use thiserror::Error;

use crate::interfaces::EntryKind;
use crate::queue::QueueStatus;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    // ==================== Input validation ====================
    /// Requested tick offset is outside the configured guardrails
    #[error("tick offset {offset} outside allowed range [{min}, {max}]")]
    TickOffsetOutOfRange {
        /// Requested offset
        offset: u64,
        /// Configured minimum
        min: u64,
        /// Configured maximum
        max: u64,
    },

    /// Target tick does not fit the 32-bit wire width
    #[error("target tick {0} does not fit in 32 bits")]
    TickOutOfRange(u64),

    /// Input payload length does not match the declared entry size
    #[error("input size mismatch: entry declares {expected} bytes, got {actual}")]
    InputSizeMismatch {
        /// Size declared by the interface entry
        expected: u32,
        /// Size of the supplied payload
        actual: usize,
    },

    /// Asset name failed validation
    #[error("invalid asset name: {0}")]
    AssetName(String),

    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Send-many list exceeds the slot capacity
    #[error("too many transfers: {got} exceeds the {max}-slot capacity")]
    TooManyTransfers {
        /// Slot capacity
        max: usize,
        /// Number of transfers supplied
        got: usize,
    },

    /// A required builder field was not set
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    // ==================== Transport ====================
    /// RPC endpoint answered with a non-2xx status
    #[error("rpc request failed: {method} {url} -> {status} {status_text}")]
    RpcRequestFailed {
        /// Full request URL
        url: String,
        /// HTTP method
        method: String,
        /// HTTP status code
        status: u16,
        /// HTTP status text
        status_text: String,
        /// Response body, as text
        body: String,
    },

    /// RPC endpoint answered with a body that did not parse
    #[error("rpc response is not valid JSON ({url}): {message}")]
    RpcInvalidJson {
        /// Full request URL
        url: String,
        /// Parse failure detail
        message: String,
    },

    /// Indexer (log-stream peer) connection or request failed
    #[error("indexer request failed ({url}): {message}")]
    IndexerRequestFailed {
        /// Endpoint URL
        url: String,
        /// Failure detail
        message: String,
    },

    /// Indexer sent a frame that did not parse where parsing is mandatory
    #[error("indexer sent invalid JSON: {message}")]
    IndexerInvalidJson {
        /// Parse failure detail
        message: String,
    },

    // ==================== Domain ====================
    /// The network processed the target tick and the transaction is absent
    #[error("transaction {tx_id} not found after tick {target_tick} was processed")]
    TxNotFound {
        /// Transaction id that was looked up
        tx_id: String,
        /// Target tick of the transaction
        target_tick: Tick,
    },

    /// Confirmation gave up before the target tick was processed
    #[error("confirmation of {tx_id} timed out after {elapsed_ms} ms")]
    TxConfirmationTimeout {
        /// Transaction id that was being confirmed
        tx_id: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// Confirmation was cancelled
    #[error("confirmation of {tx_id} aborted")]
    TxConfirmationAborted {
        /// Transaction id that was being confirmed
        tx_id: String,
    },

    /// A queued transaction reached a terminal status other than confirmed
    #[error("queued transaction ended {status}: {cause}")]
    QueuedTransaction {
        /// Terminal status of the queue item
        status: QueueStatus,
        /// Underlying failure description
        cause: String,
    },

    /// Enqueue was refused by the active-slot policy
    #[error("queue conflict for {source_id}: {message}")]
    QueueConflict {
        /// Source identity whose slot is contended
        source_id: String,
        /// Policy decision detail
        message: String,
    },

    /// A contract query retry loop was cancelled
    #[error("contract query aborted")]
    ContractQueryAborted,

    /// Interface entry lookup failed
    #[error("no {kind} named {name:?} on contract {contract}")]
    EntryNotFound {
        /// Contract name
        contract: String,
        /// Entry kind that was requested
        kind: EntryKind,
        /// Entry name that was requested
        name: String,
    },

    /// A typed operation needs a codec and none is configured
    #[error("no codec for entry {name:?} on contract {contract}")]
    CodecMissing {
        /// Contract name
        contract: String,
        /// Entry name
        name: String,
    },

    /// Codec registry named an entry the interface does not declare
    #[error("codec validation failed: {0}")]
    CodecValidation(String),

    /// A codec encode/decode call failed
    #[error("codec {operation} failed for {entry:?}: {message}")]
    Codec {
        /// "encode" or "decode"
        operation: &'static str,
        /// Entry name the codec was applied to
        entry: String,
        /// Failure detail from the codec, stringified
        message: String,
    },

    /// Interface file is structurally unusable for the requested operation
    #[error("interface for contract {contract} is invalid: {message}")]
    InterfaceInvalid {
        /// Contract name
        contract: String,
        /// What is missing or malformed
        message: String,
    },

    // ==================== Vault ====================
    /// Vault file does not exist and `create` was not requested
    #[error("vault not found: {0}")]
    VaultNotFound(String),

    /// Passphrase failed to authenticate against the vault contents
    #[error("invalid vault passphrase")]
    VaultInvalidPassphrase,

    /// No entry matched the given name or identity
    #[error("vault entry not found: {0}")]
    VaultEntryNotFound(String),

    /// An entry with this name already exists
    #[error("vault entry already exists: {0}")]
    VaultEntryExists(String),

    /// Any other vault failure (unsupported version, lock contention, ...)
    #[error("vault error: {0}")]
    Vault(String),

    // ==================== Glue ====================
    /// Crypto collaborator failure
    #[error("crypto error: {0}")]
    Crypto(#[from] fugue_crypto::CryptoError),

    /// Primitive parse failure
    #[error("{0}")]
    Primitive(#[from] fugue_primitives::PrimitiveError),

    /// Serialization failure outside the RPC path
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl SdkError {
    /// True for the confirmation-abort kinds produced by cancellation.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            SdkError::TxConfirmationAborted { .. } | SdkError::ContractQueryAborted
        )
    }
}
