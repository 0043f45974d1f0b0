//! Tick-bounded confirmation loop
//!
//! The ledger only guarantees a transaction's non-inclusion once the target
//! tick has been fully processed and the archive still reports absence;
//! before that, a 404 is ambiguous. The loop therefore polls the archive's
//! last-processed tick, and only starts looking up the hash once
//! `last_processed >= target`.

use std::time::{Duration, Instant};

use fugue_primitives::Tick;
use tokio_util::sync::CancellationToken;

use crate::rpc::RpcClient;
use crate::types::QueryTransaction;
use crate::SdkError;

/// Default confirmation timeout
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);
/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Options for one confirmation wait
#[derive(Debug, Clone)]
pub struct ConfirmOptions {
    /// Transaction id to look up (the network-reported id)
    pub tx_id: String,
    /// Tick the transaction targets
    pub target_tick: Tick,
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
    /// External cancellation; merged with the internal token
    pub cancel: Option<CancellationToken>,
}

impl ConfirmOptions {
    /// Options with default timeout and poll interval.
    pub fn new(tx_id: impl Into<String>, target_tick: Tick) -> Self {
        Self {
            tx_id: tx_id.into(),
            target_tick,
            timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }

    /// Override the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Wait until the network has processed the target tick and the transaction
/// either appears or conclusively does not.
///
/// Outcomes:
/// - `Ok(record)` — the archive returned the confirmed record.
/// - `TxNotFound` — the target tick was processed, the archive still
///   answered 404 at least once afterwards, and the timeout elapsed.
/// - `TxConfirmationTimeout` — the timeout elapsed before the target tick
///   was ever observed as processed.
/// - `TxConfirmationAborted` — the cancel token fired.
///
/// Cancellation after a record has been fetched is ignored; the success
/// stands.
pub async fn wait_for_confirmation(
    rpc: &RpcClient,
    options: &ConfirmOptions,
) -> Result<QueryTransaction, SdkError> {
    let cancel = options.cancel.clone().unwrap_or_default();
    let started = Instant::now();
    let mut seen_not_found_after_target = false;

    loop {
        if cancel.is_cancelled() {
            return Err(aborted(options));
        }

        if started.elapsed() > options.timeout {
            return Err(if seen_not_found_after_target {
                SdkError::TxNotFound {
                    tx_id: options.tx_id.clone(),
                    target_tick: options.target_tick,
                }
            } else {
                SdkError::TxConfirmationTimeout {
                    tx_id: options.tx_id.clone(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            });
        }

        let last_processed = tokio::select! {
            r = rpc.last_processed_tick() => r?,
            _ = cancel.cancelled() => return Err(aborted(options)),
        };

        if last_processed < options.target_tick {
            tracing::trace!(
                tx_id = %options.tx_id,
                %last_processed,
                target = %options.target_tick,
                "target tick not yet processed"
            );
            sleep_cancellable(options, &cancel).await?;
            continue;
        }

        let lookup = tokio::select! {
            r = rpc.transaction_by_hash(&options.tx_id) => r?,
            _ = cancel.cancelled() => return Err(aborted(options)),
        };

        match lookup {
            Some(record) => {
                tracing::debug!(tx_id = %options.tx_id, tick = %record.tick_number, "confirmed");
                return Ok(record);
            }
            None => {
                seen_not_found_after_target = true;
                sleep_cancellable(options, &cancel).await?;
            }
        }
    }
}

async fn sleep_cancellable(
    options: &ConfirmOptions,
    cancel: &CancellationToken,
) -> Result<(), SdkError> {
    tokio::select! {
        _ = tokio::time::sleep(options.poll_interval) => Ok(()),
        _ = cancel.cancelled() => Err(aborted(options)),
    }
}

fn aborted(options: &ConfirmOptions) -> SdkError {
    SdkError::TxConfirmationAborted {
        tx_id: options.tx_id.clone(),
    }
}
