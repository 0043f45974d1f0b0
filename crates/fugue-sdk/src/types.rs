//! Wire types for the live and archive RPC surfaces

use fugue_primitives::{Epoch, Identity, Tick};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serde helpers for integers that may arrive as JSON numbers or decimal
/// strings. Archive fields wider than 53 bits are transmitted as strings;
/// both forms normalize to native wide integers in memory.
pub mod wide {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::Deserializer;

    struct WideU64;

    impl<'de> Visitor<'de> for WideU64 {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative value {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.parse::<u64>()
                .map_err(|_| E::custom(format!("invalid integer string {v:?}")))
        }
    }

    /// Deserialize a `u64` from a number or decimal string.
    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(WideU64)
    }

    /// Deserialize an `Option<u64>` from a number, decimal string, or null.
    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        struct OptWide;

        impl<'de> Visitor<'de> for OptWide {
            type Value = Option<u64>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an optional unsigned integer or decimal string")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                super::wide::u64(d).map(Some)
            }
        }

        deserializer.deserialize_option(OptWide)
    }
}

/// Current tick report from the live surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickInfo {
    /// Current tick
    pub tick: Tick,
    /// Current epoch
    #[serde(default)]
    pub epoch: Epoch,
    /// First tick of the current epoch
    #[serde(default)]
    pub initial_tick: Tick,
}

/// Balance report for one identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// The identity the balance belongs to
    pub id: Identity,
    /// Balance in base units
    #[serde(deserialize_with = "wide::u64")]
    pub balance: u64,
    /// Tick the balance was read at
    #[serde(default)]
    pub valid_for_tick: Tick,
    /// Number of incoming transfers observed
    #[serde(default, deserialize_with = "wide::opt_u64")]
    pub number_of_incoming_transfers: Option<u64>,
    /// Number of outgoing transfers observed
    #[serde(default, deserialize_with = "wide::opt_u64")]
    pub number_of_outgoing_transfers: Option<u64>,
}

/// Result of broadcasting a signed transaction.
///
/// `network_tx_id` is the id the network reports back; it usually equals the
/// locally computed id but is authoritative for later lookups, so both are
/// kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    /// Number of peers the transaction was announced to
    #[serde(rename = "peersBroadcasted")]
    pub peers_broadcast: i32,
    /// Base64 of the broadcast wire bytes
    pub encoded_transaction: String,
    /// Transaction id as reported by the network
    #[serde(rename = "transactionId")]
    pub network_tx_id: String,
}

/// A confirmed transaction record from the archive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTransaction {
    /// Transaction hash/id
    pub hash: String,
    /// Amount in base units
    #[serde(deserialize_with = "wide::u64")]
    pub amount: u64,
    /// Source identity
    pub source: Identity,
    /// Destination identity
    pub destination: Identity,
    /// Tick the transaction was included at
    pub tick_number: Tick,
    /// Unix timestamp of the tick, milliseconds
    #[serde(default, deserialize_with = "wide::u64")]
    pub timestamp: u64,
    /// Contract input type
    #[serde(default)]
    pub input_type: u16,
    /// Declared input size
    #[serde(default)]
    pub input_size: u32,
    /// Input payload, base64
    #[serde(default)]
    pub input_data: String,
    /// Signature, base64
    #[serde(default)]
    pub signature: String,
    /// Whether value actually moved (absent on older archives)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_flew: Option<bool>,
}

/// Pagination window for archive listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Zero-based offset
    pub offset: u32,
    /// Page size
    pub size: u32,
}

/// Request body for per-identity transaction listings.
///
/// The archive's filter and range languages are server-defined; they pass
/// through as JSON maps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityTransactionsRequest {
    /// Identity to list transactions for
    pub identity: Identity,
    /// Field filters, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
    /// Field ranges, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Map<String, Value>>,
    /// Pagination window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl IdentityTransactionsRequest {
    /// Request all transactions for one identity, unfiltered.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            filters: None,
            ranges: None,
            pagination: None,
        }
    }
}

/// One page of archive transactions
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPage {
    /// The transactions on this page
    #[serde(default)]
    pub transactions: Vec<QueryTransaction>,
    /// Total number of matches, when the archive reports it
    #[serde(default, deserialize_with = "wide::opt_u64")]
    pub total_count: Option<u64>,
}

/// Per-tick metadata from the archive
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickData {
    /// Tick number
    pub tick_number: Tick,
    /// Epoch the tick belongs to
    #[serde(default)]
    pub epoch: Epoch,
    /// Unix timestamp of the tick, milliseconds
    #[serde(default, deserialize_with = "wide::u64")]
    pub timestamp: u64,
    /// Transaction ids included at this tick
    #[serde(default)]
    pub transaction_ids: Vec<String>,
}

/// A contiguous range of processed ticks
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickInterval {
    /// First processed tick of the interval
    pub initial_processed_tick: Tick,
    /// Last processed tick of the interval
    pub last_processed_tick: Tick,
}

/// Epoch + interval pairing as reported by the archive
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTickIntervals {
    /// Epoch the intervals belong to
    pub epoch: Epoch,
    /// Processed intervals within the epoch
    #[serde(default)]
    pub intervals: Vec<TickInterval>,
}

/// Computor list for one epoch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputorList {
    /// Epoch the list applies to
    pub epoch: Epoch,
    /// Computor identities
    #[serde(default)]
    pub identities: Vec<Identity>,
    /// Aggregate signature over the list
    #[serde(default)]
    pub signature: String,
}

// ==================== Response envelopes ====================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TickInfoEnvelope {
    pub tick_info: TickInfo,
}

#[derive(Deserialize)]
pub(crate) struct BalanceEnvelope {
    pub balance: Balance,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LastProcessedTickEnvelope {
    pub last_processed_tick: Tick,
}

#[derive(Deserialize)]
pub(crate) struct TransactionEnvelope {
    pub transaction: QueryTransaction,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SmartContractEnvelope {
    pub response_data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TickDataEnvelope {
    pub tick_data: Option<TickData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessedTickIntervalsEnvelope {
    #[serde(default)]
    pub processed_tick_intervals_per_epoch: Vec<ProcessedTickIntervals>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ComputorListsEnvelope {
    #[serde(default)]
    pub computors: Vec<ComputorList>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_wide_string() {
        let json = r#"{
            "id": "ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH",
            "balance": "18446744073709551615",
            "validForTick": "123"
        }"#;
        let balance: Balance = serde_json::from_str(json).unwrap();
        assert_eq!(balance.balance, u64::MAX);
        assert_eq!(balance.valid_for_tick, Tick::new(123));
    }

    #[test]
    fn test_query_transaction_number_and_string() {
        let json = r#"{
            "hash": "tx",
            "amount": 5,
            "source": "ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH",
            "destination": "ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH",
            "tickNumber": "777",
            "timestamp": "1700000000000"
        }"#;
        let tx: QueryTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount, 5);
        assert_eq!(tx.tick_number, Tick::new(777));
        assert_eq!(tx.timestamp, 1_700_000_000_000);
        assert!(tx.money_flew.is_none());
    }

    #[test]
    fn test_broadcast_result_field_names() {
        let json = r#"{
            "peersBroadcasted": 3,
            "encodedTransaction": "AAEC",
            "transactionId": "abc"
        }"#;
        let result: BroadcastResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.peers_broadcast, 3);
        assert_eq!(result.network_tx_id, "abc");
    }

    #[test]
    fn test_identity_request_skips_empty() {
        let id = Identity::parse("ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH")
            .unwrap();
        let req = IdentityTransactionsRequest::new(id);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("identity").is_some());
        assert!(json.get("filters").is_none());
        assert!(json.get("pagination").is_none());
    }
}
