//! Per-contract handle: queries and procedure transactions

use std::sync::Arc;
use std::time::Duration;

use fugue_primitives::{Identity, PublicKey, Tick};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::codec::{wrap_codec_error, CodecRegistry, ContractCodec};
use super::{EntryKind, InterfaceEntry, InterfaceFile};
use crate::client::{FugueClient, TransferReceipt};
use crate::contract_query::{
    query_contract_raw, RawQuery, DEFAULT_QUERY_RETRIES, DEFAULT_QUERY_RETRY_DELAY,
};
use crate::tx_builder::{SeedSource, SignedTransaction, TxBuilder};
use crate::types::BroadcastResult;
use crate::SdkError;

/// Arguments for a contract function query.
#[derive(Default)]
pub struct QueryCall {
    /// Explicit input bytes; wins over `value`
    pub input: Option<Vec<u8>>,
    /// Input value for codec encoding
    pub value: Option<Value>,
    /// Explicit codec; wins over the registry codec
    pub codec: Option<Arc<dyn ContractCodec>>,
    /// Overrides the entry's declared output size
    pub expected_output_size: Option<u32>,
    /// Skip the declared-input-size guard
    pub allow_size_mismatch: bool,
    /// Short-response retry budget
    pub retries: Option<u32>,
    /// Delay between short-response retries
    pub retry_delay: Option<Duration>,
    /// Cancels the query
    pub cancel: Option<CancellationToken>,
}

impl QueryCall {
    /// A query with explicit input bytes.
    pub fn bytes(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Some(input.into()),
            ..Default::default()
        }
    }

    /// A query with a codec-encoded input value.
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

/// Arguments for a procedure transaction.
pub struct ProcedureCall {
    /// Signing source
    pub source: SeedSource,
    /// Amount attached to the transaction
    pub amount: u64,
    /// Target tick; suggested from the current tick when absent
    pub target_tick: Option<Tick>,
    /// Explicit input bytes; wins over `value`
    pub input: Option<Vec<u8>>,
    /// Input value for codec encoding
    pub value: Option<Value>,
    /// Explicit codec; wins over the registry codec
    pub codec: Option<Arc<dyn ContractCodec>>,
}

impl ProcedureCall {
    /// A procedure call with explicit input bytes and no attached amount.
    pub fn bytes(source: SeedSource, input: impl Into<Vec<u8>>) -> Self {
        Self {
            source,
            amount: 0,
            target_tick: None,
            input: Some(input.into()),
            value: None,
            codec: None,
        }
    }

    /// A procedure call with a codec-encoded input value.
    pub fn value(source: SeedSource, value: Value) -> Self {
        Self {
            source,
            amount: 0,
            target_tick: None,
            input: None,
            value: Some(value),
            codec: None,
        }
    }
}

/// Result of a contract function query.
#[derive(Debug, Clone)]
pub struct ContractQueryResult {
    /// Raw response bytes
    pub response: Vec<u8>,
    /// Attempts issued by the retry loop (starts at 1)
    pub attempts: u32,
    /// Codec-decoded response, when a codec applied
    pub decoded: Option<Value>,
}

/// A handle to one contract in the registry.
#[derive(Clone)]
pub struct ContractHandle {
    client: FugueClient,
    file: Arc<InterfaceFile>,
    codecs: Option<Arc<CodecRegistry>>,
}

impl ContractHandle {
    pub(crate) fn new(
        client: FugueClient,
        file: Arc<InterfaceFile>,
        codecs: Option<Arc<CodecRegistry>>,
    ) -> Self {
        Self { client, file, codecs }
    }

    /// The contract name.
    pub fn name(&self) -> &str {
        &self.file.contract.name
    }

    /// The interface file backing this handle.
    pub fn interface(&self) -> &InterfaceFile {
        &self.file
    }

    /// Resolve an entry, failing with a typed not-found error.
    pub fn entry(&self, kind: EntryKind, name: &str) -> Result<&InterfaceEntry, SdkError> {
        self.file.entry(kind, name).ok_or_else(|| SdkError::EntryNotFound {
            contract: self.file.contract.name.clone(),
            kind,
            name: name.to_string(),
        })
    }

    fn resolve_codec(
        &self,
        kind: EntryKind,
        name: &str,
        explicit: Option<Arc<dyn ContractCodec>>,
    ) -> Option<Arc<dyn ContractCodec>> {
        explicit.or_else(|| self.codecs.as_ref().and_then(|c| c.get(kind, name).cloned()))
    }

    /// Materialize input bytes: explicit bytes win, else codec-encode the
    /// value, else empty.
    fn materialize_input(
        &self,
        entry: &InterfaceEntry,
        input: Option<Vec<u8>>,
        value: Option<&Value>,
        codec: Option<&Arc<dyn ContractCodec>>,
    ) -> Result<Vec<u8>, SdkError> {
        if let Some(bytes) = input {
            return Ok(bytes);
        }
        match (value, codec) {
            (Some(value), Some(codec)) => codec
                .encode(entry, value)
                .map_err(|e| wrap_codec_error("encode", entry, e)),
            (Some(_), None) => Err(SdkError::CodecMissing {
                contract: self.file.contract.name.clone(),
                name: entry.name.clone(),
            }),
            (None, _) => Ok(Vec::new()),
        }
    }

    fn check_input_size(
        entry: &InterfaceEntry,
        bytes: &[u8],
        allow_mismatch: bool,
    ) -> Result<(), SdkError> {
        if let Some(expected) = entry.input_size {
            if !allow_mismatch && bytes.len() as u64 != u64::from(expected) {
                return Err(SdkError::InputSizeMismatch {
                    expected,
                    actual: bytes.len(),
                });
            }
        }
        Ok(())
    }

    /// Query a contract function.
    ///
    /// Size validation happens before any RPC call; the expected output size
    /// falls back to the entry's declared `output_size`.
    pub async fn query(&self, name: &str, call: QueryCall) -> Result<ContractQueryResult, SdkError> {
        let entry = self.entry(EntryKind::Function, name)?.clone();
        let codec = self.resolve_codec(EntryKind::Function, name, call.codec);

        let input =
            self.materialize_input(&entry, call.input, call.value.as_ref(), codec.as_ref())?;
        Self::check_input_size(&entry, &input, call.allow_size_mismatch)?;

        let contract_index = self.file.contract.contract_index.ok_or_else(|| {
            SdkError::InterfaceInvalid {
                contract: self.file.contract.name.clone(),
                message: "function queries require contractIndex".to_string(),
            }
        })?;

        let query = RawQuery {
            contract_index,
            input_type: entry.input_type,
            input,
            expected_output_size: call.expected_output_size.or(entry.output_size),
            retries: call.retries.unwrap_or(DEFAULT_QUERY_RETRIES),
            retry_delay: call.retry_delay.unwrap_or(DEFAULT_QUERY_RETRY_DELAY),
            cancel: call.cancel,
        };

        let raw = query_contract_raw(self.client.rpc(), &query).await?;

        let decoded = match &codec {
            Some(codec) => Some(
                codec
                    .decode(&entry, &raw.response)
                    .map_err(|e| wrap_codec_error("decode", &entry, e))?,
            ),
            None => None,
        };

        Ok(ContractQueryResult {
            response: raw.response,
            attempts: raw.attempts,
            decoded,
        })
    }

    /// Query a contract function and return only the decoded value.
    ///
    /// Fails when no codec is configured for the entry.
    pub async fn query_value(&self, name: &str, call: QueryCall) -> Result<Value, SdkError> {
        if call.codec.is_none()
            && self
                .resolve_codec(EntryKind::Function, name, None)
                .is_none()
        {
            return Err(SdkError::CodecMissing {
                contract: self.file.contract.name.clone(),
                name: name.to_string(),
            });
        }
        let result = self.query(name, call).await?;
        result.decoded.ok_or_else(|| SdkError::CodecMissing {
            contract: self.file.contract.name.clone(),
            name: name.to_string(),
        })
    }

    /// The contract's transaction destination identity.
    ///
    /// `contract_id` wins; otherwise the public key hex is decoded (must be
    /// 32 bytes) and converted.
    pub fn contract_identity(&self) -> Result<Identity, SdkError> {
        let descriptor = &self.file.contract;
        if let Some(id) = &descriptor.contract_id {
            return Ok(id.clone());
        }
        if let Some(hex_key) = &descriptor.contract_public_key_hex {
            let bytes = hex::decode(hex_key).map_err(|e| SdkError::InvalidHex(e.to_string()))?;
            if bytes.len() != PublicKey::LEN {
                return Err(SdkError::InterfaceInvalid {
                    contract: descriptor.name.clone(),
                    message: format!(
                        "contractPublicKeyHex must decode to 32 bytes, got {}",
                        bytes.len()
                    ),
                });
            }
            let key = PublicKey::from_slice(&bytes)?;
            return Ok(fugue_crypto::identity_from_public_key(&key));
        }
        Err(SdkError::InterfaceInvalid {
            contract: descriptor.name.clone(),
            message: "procedures require contractId or contractPublicKeyHex".to_string(),
        })
    }

    /// Build (and sign) a procedure transaction without sending it.
    ///
    /// Unlike queries there is no size-mismatch escape: a declared input
    /// size is always enforced.
    pub async fn build_procedure_transaction(
        &self,
        name: &str,
        call: ProcedureCall,
    ) -> Result<SignedTransaction, SdkError> {
        let entry = self.entry(EntryKind::Procedure, name)?.clone();
        let codec = self.resolve_codec(EntryKind::Procedure, name, call.codec);

        let input =
            self.materialize_input(&entry, call.input, call.value.as_ref(), codec.as_ref())?;
        Self::check_input_size(&entry, &input, false)?;

        let destination = self.contract_identity()?;
        let target_tick = match call.target_tick {
            Some(tick) => tick,
            None => self.client.suggested_target_tick(None).await?,
        };

        TxBuilder::new()
            .source(call.source)
            .to(destination)
            .amount(call.amount)
            .target_tick(target_tick)
            .input_type(entry.input_type)
            .input(input)
            .build()
    }

    /// Build and broadcast a procedure transaction.
    pub async fn send_procedure(
        &self,
        name: &str,
        call: ProcedureCall,
    ) -> Result<(SignedTransaction, BroadcastResult), SdkError> {
        let signed = self.build_procedure_transaction(name, call).await?;
        self.client.broadcast_built(signed).await
    }

    /// Build, broadcast and confirm a procedure transaction.
    pub async fn send_procedure_and_confirm(
        &self,
        name: &str,
        call: ProcedureCall,
    ) -> Result<TransferReceipt, SdkError> {
        let source = call.source.clone();
        let signed = self.build_procedure_transaction(name, call).await?;
        self.client.send_built_and_confirm(source, signed, false).await
    }

    /// Like [`ContractHandle::send_procedure_and_confirm`], additionally
    /// fetching the confirmed archive record.
    pub async fn send_procedure_and_confirm_with_receipt(
        &self,
        name: &str,
        call: ProcedureCall,
    ) -> Result<TransferReceipt, SdkError> {
        let source = call.source.clone();
        let signed = self.build_procedure_transaction(name, call).await?;
        self.client.send_built_and_confirm(source, signed, true).await
    }
}
