//! High-level client façade
//!
//! `FugueClient` wires the subsystems together: the typed RPC client, the
//! tick helper, the per-source queue, the confirmation engine and the
//! interface registry. The canonical send path is
//! build → enqueue → broadcast → confirm → (optionally) fetch the record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fugue_primitives::{Identity, Tick};
use tokio_util::sync::CancellationToken;

use crate::confirm::{
    wait_for_confirmation, ConfirmOptions, DEFAULT_CONFIRM_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
use crate::contract_query::{query_contract_raw, RawQuery, RawQueryResult};
use crate::interfaces::{CodecRegistry, ContractHandle, InterfaceFile, InterfaceRegistry};
use crate::queue::{QueueItem, QueuePolicy, QueueStatus, TxQueue};
use crate::rpc::{RpcClient, RpcHooks};
use crate::tick::{suggested_target_tick, TickOffsets};
use crate::transport::Transport;
use crate::tx_builder::{SeedSource, SignedTransaction, TxBuilder};
use crate::types::{BroadcastResult, QueryTransaction};
use crate::SdkError;

/// Configuration for [`FugueClient`].
#[derive(Debug, Clone)]
pub struct FugueClientConfig {
    /// Base URL shared by the live and archive surfaces
    pub base_url: String,
    /// Target-tick offset guardrails
    pub tick_offsets: TickOffsets,
    /// Queue policy; `None` disables the queue entirely
    pub queue: Option<QueuePolicy>,
    /// Confirmation timeout
    pub confirm_timeout: Duration,
    /// Confirmation poll interval
    pub poll_interval: Duration,
    /// Observability hooks for the RPC layer
    pub hooks: RpcHooks,
}

impl FugueClientConfig {
    /// Defaults: queue enabled with `WaitForConfirm`, 60 s confirmation
    /// timeout, 1 s polls.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tick_offsets: TickOffsets::default(),
            queue: Some(QueuePolicy::WaitForConfirm),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            hooks: RpcHooks::default(),
        }
    }
}

/// A value transfer (or typed transaction) to send.
#[derive(Debug, Clone)]
pub struct TransferParams {
    /// Signing source
    pub source: SeedSource,
    /// Destination identity
    pub to: Identity,
    /// Amount in base units
    pub amount: u64,
    /// Target tick; suggested from the current tick when absent
    pub target_tick: Option<Tick>,
    /// Input type (0 for plain transfers)
    pub input_type: u16,
    /// Input payload (empty for plain transfers)
    pub input: Vec<u8>,
    /// Cancels the confirmation wait
    pub cancel: Option<CancellationToken>,
}

impl TransferParams {
    /// A plain value transfer: input type 0, empty input.
    pub fn transfer(source: SeedSource, to: Identity, amount: u64) -> Self {
        Self {
            source,
            to,
            amount,
            target_tick: None,
            input_type: 0,
            input: Vec::new(),
            cancel: None,
        }
    }

    /// Pin the target tick.
    pub fn at_tick(mut self, tick: Tick) -> Self {
        self.target_tick = Some(tick);
        self
    }
}

/// Everything known about a sent transaction.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// The signed transaction that was sent
    pub signed: SignedTransaction,
    /// Broadcast outcome
    pub broadcast: BroadcastResult,
    /// Confirmed archive record, when fetched
    pub confirmation: Option<QueryTransaction>,
    /// Terminal queue item, when the send went through the queue
    pub queue_item: Option<QueueItem>,
}

/// High-level SDK client.
#[derive(Clone)]
pub struct FugueClient {
    rpc: RpcClient,
    tick_offsets: TickOffsets,
    queue: Option<Arc<TxQueue>>,
    registry: Option<Arc<InterfaceRegistry>>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for FugueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FugueClient").finish_non_exhaustive()
    }
}

impl FugueClient {
    /// Connect over HTTP with default configuration.
    pub fn connect(base_url: &str) -> Result<Self, SdkError> {
        Self::with_config(FugueClientConfig::new(base_url))
    }

    /// Build a client from explicit configuration.
    pub fn with_config(config: FugueClientConfig) -> Result<Self, SdkError> {
        config.tick_offsets.validate()?;
        Ok(Self {
            rpc: RpcClient::connect(&config.base_url).with_hooks(config.hooks),
            tick_offsets: config.tick_offsets,
            queue: config.queue.map(|policy| Arc::new(TxQueue::new(policy))),
            registry: None,
            confirm_timeout: config.confirm_timeout,
            poll_interval: config.poll_interval,
        })
    }

    /// Build a client over a custom transport (used by tests).
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            rpc: RpcClient::with_transport(transport),
            tick_offsets: TickOffsets::default(),
            queue: Some(Arc::new(TxQueue::default())),
            registry: None,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Replace the queue policy.
    pub fn with_queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue = Some(Arc::new(TxQueue::new(policy)));
        self
    }

    /// Disable the queue; `send_and_confirm` then confirms directly.
    pub fn without_queue(mut self) -> Self {
        self.queue = None;
        self
    }

    /// Override the confirmation tuning.
    pub fn with_confirm_tuning(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Attach an interface registry built from files and codecs.
    pub fn with_interfaces(
        mut self,
        files: Vec<InterfaceFile>,
        codecs: HashMap<String, CodecRegistry>,
    ) -> Result<Self, SdkError> {
        self.registry = Some(Arc::new(InterfaceRegistry::with_codecs(files, codecs)?));
        Ok(self)
    }

    /// Attach a prebuilt interface registry.
    pub fn with_registry(mut self, registry: InterfaceRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// The underlying typed RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// The queue, when configured.
    pub fn queue(&self) -> Option<&Arc<TxQueue>> {
        self.queue.as_ref()
    }

    // ==================== Ticks ====================

    /// Suggest a target tick from the current tick plus an offset.
    pub async fn suggested_target_tick(&self, offset: Option<u64>) -> Result<Tick, SdkError> {
        suggested_target_tick(&self.rpc, &self.tick_offsets, offset).await
    }

    // ==================== Transfers ====================

    /// Build and sign a transfer, resolving the target tick when absent.
    pub async fn build_transfer(
        &self,
        params: &TransferParams,
    ) -> Result<SignedTransaction, SdkError> {
        let target_tick = match params.target_tick {
            Some(tick) => tick,
            None => self.suggested_target_tick(None).await?,
        };

        TxBuilder::new()
            .source(params.source.clone())
            .to(params.to.clone())
            .amount(params.amount)
            .target_tick(target_tick)
            .input_type(params.input_type)
            .input(params.input.clone())
            .build()
    }

    /// Build and broadcast, without waiting for confirmation.
    pub async fn send(
        &self,
        params: &TransferParams,
    ) -> Result<(SignedTransaction, BroadcastResult), SdkError> {
        let signed = self.build_transfer(params).await?;
        self.broadcast_built(signed).await
    }

    /// Broadcast an already-built transaction.
    pub async fn broadcast_built(
        &self,
        signed: SignedTransaction,
    ) -> Result<(SignedTransaction, BroadcastResult), SdkError> {
        let broadcast = self.rpc.broadcast_transaction(&signed.bytes).await?;
        Ok((signed, broadcast))
    }

    /// Build, broadcast and wait for confirmation.
    ///
    /// When a queue is configured the send is serialized per source
    /// identity; a terminal queue status other than `Confirmed` surfaces as
    /// a [`SdkError::QueuedTransaction`].
    pub async fn send_and_confirm(
        &self,
        params: &TransferParams,
    ) -> Result<TransferReceipt, SdkError> {
        let signed = self.build_transfer(params).await?;
        self.send_built_and_confirm_with_cancel(
            params.source.clone(),
            signed,
            false,
            params.cancel.clone(),
        )
        .await
    }

    /// Like [`FugueClient::send_and_confirm`], additionally fetching the
    /// confirmed archive record.
    pub async fn send_and_confirm_with_receipt(
        &self,
        params: &TransferParams,
    ) -> Result<TransferReceipt, SdkError> {
        let signed = self.build_transfer(params).await?;
        self.send_built_and_confirm_with_cancel(
            params.source.clone(),
            signed,
            true,
            params.cancel.clone(),
        )
        .await
    }

    /// Send through the queue and return the terminal queue item, whatever
    /// its status. Requires the queue to be configured.
    pub async fn send_queued(&self, params: &TransferParams) -> Result<QueueItem, SdkError> {
        let queue = self.queue.clone().ok_or(SdkError::MissingField("queue"))?;
        let signed = self.build_transfer(params).await?;
        let source = source_identity(&params.source)?;
        self.run_queued(&queue, source, signed, params.cancel.clone())
            .await
    }

    /// Shared send-and-confirm path for transfers and procedures.
    pub(crate) async fn send_built_and_confirm(
        &self,
        source: SeedSource,
        signed: SignedTransaction,
        with_receipt: bool,
    ) -> Result<TransferReceipt, SdkError> {
        self.send_built_and_confirm_with_cancel(source, signed, with_receipt, None)
            .await
    }

    async fn send_built_and_confirm_with_cancel(
        &self,
        source: SeedSource,
        signed: SignedTransaction,
        with_receipt: bool,
        cancel: Option<CancellationToken>,
    ) -> Result<TransferReceipt, SdkError> {
        match self.queue.clone() {
            Some(queue) => {
                let source = source_identity(&source)?;
                let item = self
                    .run_queued(&queue, source, signed.clone(), cancel)
                    .await?;

                match item.status {
                    QueueStatus::Confirmed => {
                        let broadcast = item.result.clone().ok_or_else(|| {
                            // Protocol error: a confirmed item always carries
                            // its broadcast result.
                            SdkError::QueuedTransaction {
                                status: item.status,
                                cause: "confirmed item is missing its broadcast result"
                                    .to_string(),
                            }
                        })?;

                        let confirmation = if with_receipt {
                            self.rpc
                                .transaction_by_hash(&broadcast.network_tx_id)
                                .await?
                        } else {
                            None
                        };

                        Ok(TransferReceipt {
                            signed,
                            broadcast,
                            confirmation,
                            queue_item: Some(item),
                        })
                    }
                    status => Err(SdkError::QueuedTransaction {
                        status,
                        cause: item.error.unwrap_or_else(|| "no cause recorded".to_string()),
                    }),
                }
            }

            None => {
                let (signed, broadcast) = self.broadcast_built(signed).await?;
                let mut options =
                    ConfirmOptions::new(broadcast.network_tx_id.as_str(), signed.target_tick)
                        .timeout(self.confirm_timeout)
                        .poll_interval(self.poll_interval);
                if let Some(cancel) = cancel {
                    options = options.cancel_token(cancel);
                }

                let record = wait_for_confirmation(&self.rpc, &options).await?;
                let confirmation = if with_receipt { Some(record) } else { None };

                Ok(TransferReceipt {
                    signed,
                    broadcast,
                    confirmation,
                    queue_item: None,
                })
            }
        }
    }

    /// Run one signed transaction through the queue.
    async fn run_queued(
        &self,
        queue: &Arc<TxQueue>,
        source: Identity,
        signed: SignedTransaction,
        external_cancel: Option<CancellationToken>,
    ) -> Result<QueueItem, SdkError> {
        let rpc_broadcast = self.rpc.clone();
        let rpc_confirm = self.rpc.clone();
        let target_tick = signed.target_tick;
        let timeout = self.confirm_timeout;
        let poll_interval = self.poll_interval;

        queue
            .run(
                source,
                signed,
                |tx| async move { rpc_broadcast.broadcast_transaction(&tx.bytes).await },
                move |tx_id, queue_cancel| async move {
                    let options = ConfirmOptions::new(tx_id.as_str(), target_tick)
                        .timeout(timeout)
                        .poll_interval(poll_interval)
                        .cancel_token(queue_cancel);

                    // An external token merges with the supersession token:
                    // whichever fires first aborts the wait.
                    match external_cancel {
                        Some(external) => tokio::select! {
                            r = wait_for_confirmation(&rpc_confirm, &options) => r,
                            _ = external.cancelled() => {
                                Err(SdkError::TxConfirmationAborted { tx_id })
                            }
                        },
                        None => wait_for_confirmation(&rpc_confirm, &options).await,
                    }
                },
            )
            .await
    }

    // ==================== Contracts ====================

    /// Issue a raw contract query with the short-response retry loop.
    pub async fn query_contract_raw(&self, query: &RawQuery) -> Result<RawQueryResult, SdkError> {
        query_contract_raw(&self.rpc, query).await
    }

    /// Handle to a registered contract.
    pub fn contract(&self, name: &str) -> Result<ContractHandle, SdkError> {
        let registry = self.registry.as_ref().ok_or_else(|| SdkError::InterfaceInvalid {
            contract: name.to_string(),
            message: "no interface registry configured".to_string(),
        })?;
        let file = registry.by_name(name).ok_or_else(|| SdkError::InterfaceInvalid {
            contract: name.to_string(),
            message: "contract is not registered".to_string(),
        })?;
        Ok(ContractHandle::new(
            self.clone(),
            file.clone(),
            registry.codecs_for(name).cloned(),
        ))
    }
}

/// Derive the queue key (the source identity) for a seed source.
fn source_identity(source: &SeedSource) -> Result<Identity, SdkError> {
    let seed = source.resolve()?;
    let public_key = fugue_crypto::public_key_from_seed(&seed)?;
    Ok(fugue_crypto::identity_from_public_key(&public_key))
}
