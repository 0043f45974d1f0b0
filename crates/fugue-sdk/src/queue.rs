//! Per-source transaction queue
//!
//! At most one transaction per source identity is ever in flight. The
//! contended resource is the per-source active slot; history is append-only.
//! Conflicting enqueues are resolved by the queue's policy: wait for the
//! active item, reject, or supersede it when the new transaction targets a
//! later tick.
//!
//! Supersession cancels the active item's token. An item superseded after
//! broadcast may still confirm at the ledger; the queue reports
//! `Superseded` and callers reconcile via the archive if they need to.

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use fugue_primitives::{Identity, Tick};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::tx_builder::SignedTransaction;
use crate::types::{BroadcastResult, QueryTransaction};
use crate::SdkError;

/// Conflict policy for enqueues against a busy source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Wait for the active item to reach a terminal status, then take the
    /// slot. Waiters start in arrival order.
    #[default]
    WaitForConfirm,
    /// Fail the new enqueue immediately.
    Reject,
    /// Supersede the active item when the new target tick is strictly
    /// later; otherwise fail the new enqueue.
    ReplaceHigherTick,
}

/// Lifecycle status of a queue item.
///
/// Transitions are monotonic: `Pending → Submitted → Confirming →
/// Confirmed | Failed`, with `Superseded` reachable from any pre-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Created, not yet broadcast
    Pending,
    /// Broadcast in flight
    Submitted,
    /// Broadcast acknowledged, waiting for confirmation
    Confirming,
    /// Confirmed at the ledger (terminal)
    Confirmed,
    /// Broadcast or confirmation failed (terminal)
    Failed,
    /// Preempted by a later-tick enqueue (terminal)
    Superseded,
}

impl QueueStatus {
    /// True once the item can no longer change status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Confirmed | QueueStatus::Failed | QueueStatus::Superseded
        )
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Submitted => "submitted",
            QueueStatus::Confirming => "confirming",
            QueueStatus::Confirmed => "confirmed",
            QueueStatus::Failed => "failed",
            QueueStatus::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

/// One queued transaction and its outcome.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Unique item id
    pub id: Uuid,
    /// Source identity the slot belongs to
    pub source_identity: Identity,
    /// Tick the transaction targets
    pub target_tick: Tick,
    /// When the item was enqueued
    pub created_at: SystemTime,
    /// Current status
    pub status: QueueStatus,
    /// Locally computed transaction id
    pub tx_id: Option<String>,
    /// Broadcast outcome; present on every item that reached `Confirming`
    pub result: Option<BroadcastResult>,
    /// Failure description for `Failed`/`Superseded` items
    pub error: Option<String>,
}

impl QueueItem {
    fn new(source_identity: Identity, target_tick: Tick, tx_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_identity,
            target_tick,
            created_at: SystemTime::now(),
            status: QueueStatus::Pending,
            tx_id: Some(tx_id),
            result: None,
            error: None,
        }
    }
}

struct ActiveEntry {
    id: Uuid,
    target_tick: Tick,
    cancel: CancellationToken,
    item: Arc<Mutex<QueueItem>>,
}

#[derive(Default)]
struct SourceState {
    active: Option<ActiveEntry>,
    next_ticket: u64,
    serving: u64,
    history: Vec<QueueItem>,
}

#[derive(Default)]
struct SourceSlot {
    state: Mutex<SourceState>,
    notify: Notify,
}

/// Per-source transaction queue.
pub struct TxQueue {
    policy: QueuePolicy,
    sources: DashMap<Identity, Arc<SourceSlot>>,
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new(QueuePolicy::default())
    }
}

impl TxQueue {
    /// Create a queue with the given conflict policy.
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            policy,
            sources: DashMap::new(),
        }
    }

    /// The queue's conflict policy.
    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// Snapshot of the active item for a source, if any.
    pub fn active(&self, source: &Identity) -> Option<QueueItem> {
        let slot = self.sources.get(source)?;
        let state = slot.state.lock();
        state.active.as_ref().map(|a| a.item.lock().clone())
    }

    /// Terminal items recorded for a source, in completion order.
    pub fn history(&self, source: &Identity) -> Vec<QueueItem> {
        match self.sources.get(source) {
            Some(slot) => slot.state.lock().history.clone(),
            None => Vec::new(),
        }
    }

    /// Run one transaction through the queue.
    ///
    /// `broadcast` submits the signed bytes; `confirm` waits for inclusion
    /// and must honor the supplied cancellation token (supersession fires
    /// it). The returned item is terminal; only a policy rejection at
    /// enqueue time produces an `Err`.
    pub async fn run<B, FB, C, FC>(
        &self,
        source: Identity,
        tx: SignedTransaction,
        broadcast: B,
        confirm: C,
    ) -> Result<QueueItem, SdkError>
    where
        B: FnOnce(SignedTransaction) -> FB,
        FB: Future<Output = Result<BroadcastResult, SdkError>>,
        C: FnOnce(String, CancellationToken) -> FC,
        FC: Future<Output = Result<QueryTransaction, SdkError>>,
    {
        let slot = self.slot(&source);
        let cancel = CancellationToken::new();
        let item = Arc::new(Mutex::new(QueueItem::new(
            source.clone(),
            tx.target_tick,
            tx.tx_id.clone(),
        )));

        self.acquire(&source, &slot, &cancel, &item, tx.target_tick).await?;
        Ok(self.execute(&slot, &cancel, &item, tx, broadcast, confirm).await)
    }

    fn slot(&self, source: &Identity) -> Arc<SourceSlot> {
        self.sources
            .entry(source.clone())
            .or_insert_with(|| Arc::new(SourceSlot::default()))
            .clone()
    }

    /// Take the source's active slot according to the policy.
    async fn acquire(
        &self,
        source: &Identity,
        slot: &Arc<SourceSlot>,
        cancel: &CancellationToken,
        item: &Arc<Mutex<QueueItem>>,
        target_tick: Tick,
    ) -> Result<(), SdkError> {
        let install = |state: &mut SourceState| {
            state.active = Some(ActiveEntry {
                id: item.lock().id,
                target_tick,
                cancel: cancel.clone(),
                item: item.clone(),
            });
        };

        match self.policy {
            QueuePolicy::Reject => {
                let mut state = slot.state.lock();
                if state.active.is_some() {
                    return Err(SdkError::QueueConflict {
                        source_id: source.to_string(),
                        message: "another transaction is in flight for this source".to_string(),
                    });
                }
                install(&mut state);
                Ok(())
            }

            QueuePolicy::WaitForConfirm => {
                let ticket = {
                    let mut state = slot.state.lock();
                    let ticket = state.next_ticket;
                    state.next_ticket += 1;
                    ticket
                };
                loop {
                    let notified = slot.notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();
                    {
                        let mut state = slot.state.lock();
                        if state.serving == ticket && state.active.is_none() {
                            install(&mut state);
                            return Ok(());
                        }
                    }
                    notified.await;
                }
            }

            QueuePolicy::ReplaceHigherTick => loop {
                let notified = slot.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                {
                    let mut state = slot.state.lock();
                    match &state.active {
                        None => {
                            install(&mut state);
                            return Ok(());
                        }
                        Some(active) if target_tick > active.target_tick => {
                            // Preempt: fire the active item's token and wait
                            // for its terminal transition.
                            tracing::debug!(
                                %source,
                                old = %active.target_tick,
                                new = %target_tick,
                                "superseding active queue item"
                            );
                            active.cancel.cancel();
                        }
                        Some(active) => {
                            return Err(SdkError::QueueConflict {
                                source_id: source.to_string(),
                                message: format!(
                                    "active item targets tick {}, which is not earlier than {}",
                                    active.target_tick, target_tick
                                ),
                            });
                        }
                    }
                }
                notified.await;
            },
        }
    }

    /// Drive the item through its lifecycle. Always ends terminal.
    async fn execute<B, FB, C, FC>(
        &self,
        slot: &Arc<SourceSlot>,
        cancel: &CancellationToken,
        item: &Arc<Mutex<QueueItem>>,
        tx: SignedTransaction,
        broadcast: B,
        confirm: C,
    ) -> QueueItem
    where
        B: FnOnce(SignedTransaction) -> FB,
        FB: Future<Output = Result<BroadcastResult, SdkError>>,
        C: FnOnce(String, CancellationToken) -> FC,
        FC: Future<Output = Result<QueryTransaction, SdkError>>,
    {
        // Superseded before the broadcast ever started: nothing hit the wire.
        if cancel.is_cancelled() {
            return self.finish(
                slot,
                item,
                QueueStatus::Superseded,
                Some("superseded before broadcast".to_string()),
            );
        }

        item.lock().status = QueueStatus::Submitted;

        let broadcast_result = tokio::select! {
            r = broadcast(tx) => r,
            _ = cancel.cancelled() => {
                return self.finish(
                    slot,
                    item,
                    QueueStatus::Superseded,
                    Some("superseded during broadcast".to_string()),
                );
            }
        };

        let broadcast_result = match broadcast_result {
            Ok(result) => result,
            Err(e) => {
                return self.finish(slot, item, QueueStatus::Failed, Some(e.to_string()));
            }
        };

        let network_tx_id = broadcast_result.network_tx_id.clone();
        {
            let mut guard = item.lock();
            guard.result = Some(broadcast_result);
            guard.status = QueueStatus::Confirming;
        }

        match confirm(network_tx_id, cancel.child_token()).await {
            Ok(record) => {
                tracing::debug!(tick = %record.tick_number, "queue item confirmed");
                self.finish(slot, item, QueueStatus::Confirmed, None)
            }
            Err(e) if e.is_aborted() && cancel.is_cancelled() => {
                self.finish(slot, item, QueueStatus::Superseded, Some(e.to_string()))
            }
            Err(e) => self.finish(slot, item, QueueStatus::Failed, Some(e.to_string())),
        }
    }

    /// Terminal transition: record status, release the slot, wake waiters.
    fn finish(
        &self,
        slot: &Arc<SourceSlot>,
        item: &Arc<Mutex<QueueItem>>,
        status: QueueStatus,
        error: Option<String>,
    ) -> QueueItem {
        let snapshot = {
            let mut guard = item.lock();
            guard.status = status;
            guard.error = error;
            guard.clone()
        };

        let mut state = slot.state.lock();
        if state
            .active
            .as_ref()
            .is_some_and(|active| active.id == snapshot.id)
        {
            state.active = None;
        }
        state.history.push(snapshot.clone());
        state.serving += 1;
        drop(state);
        slot.notify.notify_waiters();

        snapshot
    }
}
