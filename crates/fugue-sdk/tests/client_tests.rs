//! Façade integration tests
//!
//! Full send paths over a scripted transport: build → (queue) → broadcast →
//! confirm → receipt.

use std::sync::Arc;
use std::time::Duration;

use fugue_primitives::{Identity, Tick};
use fugue_sdk::{
    FugueClient, MockResponse, MockTransport, QueuePolicy, QueueStatus, SdkError, SeedSource,
    TransferParams,
};
use serde_json::json;

const SEED: &str = "ftclientseedfixturezmkcvbnpoiuytrewqasdfghjklmnbvcxzaqws";

fn destination() -> Identity {
    let pk = fugue_crypto::public_key_from_seed("clientdestinationseed").unwrap();
    fugue_crypto::identity_from_public_key(&pk)
}

fn mock_client() -> (FugueClient, Arc<MockTransport>) {
    let mock = Arc::new(MockTransport::new());
    let client = FugueClient::with_transport(mock.clone())
        .with_confirm_tuning(Duration::from_millis(500), Duration::from_millis(1));
    (client, mock)
}

fn broadcast_response(tx_id: &str) -> MockResponse {
    MockResponse::json(json!({
        "peersBroadcasted": 3,
        "encodedTransaction": "",
        "transactionId": tx_id
    }))
}

fn record_response(hash: &str, tick: u64) -> MockResponse {
    let id = "ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH";
    MockResponse::json(json!({
        "transaction": {
            "hash": hash,
            "amount": 1,
            "source": id,
            "destination": id,
            "tickNumber": tick,
            "timestamp": 1
        }
    }))
}

fn params(tick: u64) -> TransferParams {
    TransferParams::transfer(SeedSource::Seed(SEED.to_string()), destination(), 1)
        .at_tick(Tick::new(tick))
}

#[tokio::test]
async fn test_send_broadcasts_built_bytes() {
    let (client, mock) = mock_client();
    mock.set_json(
        "/live/v1/broadcast-transaction",
        json!({ "peersBroadcasted": 1, "encodedTransaction": "", "transactionId": "net-tx" }),
    );

    let (signed, broadcast) = client.send(&params(1000)).await.unwrap();
    assert_eq!(signed.target_tick, Tick::new(1000));
    assert_eq!(broadcast.network_tx_id, "net-tx");

    // The body carries the base64 of exactly the signed bytes.
    let requests = mock.requests_for("/live/v1/broadcast-transaction");
    let body = requests[0].body.as_ref().unwrap();
    use base64::Engine as _;
    let sent = base64::engine::general_purpose::STANDARD
        .decode(body["encodedTransaction"].as_str().unwrap())
        .unwrap();
    assert_eq!(sent, signed.bytes);
}

#[tokio::test]
async fn test_build_resolves_target_tick_when_absent() {
    let (client, mock) = mock_client();
    mock.set_json("/live/v1/tick-info", json!({ "tickInfo": { "tick": 2000 } }));

    let mut transfer = params(0);
    transfer.target_tick = None;
    let signed = client.build_transfer(&transfer).await.unwrap();

    // Current tick plus the default offset.
    assert_eq!(signed.target_tick, Tick::new(2005));
}

#[tokio::test]
async fn test_send_and_confirm_through_queue() {
    let (client, mock) = mock_client();
    mock.set_json("/live/v1/broadcast-transaction", json!({
        "peersBroadcasted": 1, "encodedTransaction": "", "transactionId": "net-tx"
    }));
    mock.set_json("/query/v1/getLastProcessedTick", json!({ "lastProcessedTick": 50 }));
    mock.push_response("/query/v1/getTransactionByHash", record_response("net-tx", 42));

    let receipt = client.send_and_confirm(&params(42)).await.unwrap();
    assert_eq!(receipt.broadcast.network_tx_id, "net-tx");

    // Queue path: the terminal item travels on the receipt.
    let item = receipt.queue_item.expect("queued send");
    assert_eq!(item.status, QueueStatus::Confirmed);

    // Confirmation used the network-reported id.
    let lookups = mock.requests_for("/query/v1/getTransactionByHash");
    assert_eq!(lookups[0].body.as_ref().unwrap()["hash"], "net-tx");
}

#[tokio::test]
async fn test_send_and_confirm_with_receipt_fetches_record() {
    let (client, mock) = mock_client();
    mock.set_json("/live/v1/broadcast-transaction", json!({
        "peersBroadcasted": 1, "encodedTransaction": "", "transactionId": "net-tx"
    }));
    mock.set_json("/query/v1/getLastProcessedTick", json!({ "lastProcessedTick": 50 }));
    mock.set_json(
        "/query/v1/getTransactionByHash",
        json!({
            "transaction": {
                "hash": "net-tx",
                "amount": 1,
                "source": "ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH",
                "destination": "ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH",
                "tickNumber": 42,
                "timestamp": 1
            }
        }),
    );

    let receipt = client
        .send_and_confirm_with_receipt(&params(42))
        .await
        .unwrap();
    let record = receipt.confirmation.expect("archive record");
    assert_eq!(record.tick_number, Tick::new(42));
}

#[tokio::test]
async fn test_not_found_surfaces_as_queued_transaction_error() {
    let (client, mock) = mock_client();
    mock.set_json("/live/v1/broadcast-transaction", json!({
        "peersBroadcasted": 1, "encodedTransaction": "", "transactionId": "net-tx"
    }));
    mock.set_json("/query/v1/getLastProcessedTick", json!({ "lastProcessedTick": 50 }));
    mock.set_status("/query/v1/getTransactionByHash", 404, "");

    let client = client.with_confirm_tuning(Duration::from_millis(20), Duration::from_millis(1));
    let err = client.send_and_confirm(&params(42)).await.unwrap_err();

    match err {
        SdkError::QueuedTransaction { status, cause } => {
            assert_eq!(status, QueueStatus::Failed);
            assert!(cause.contains("not found"), "cause: {cause}");
        }
        other => panic!("expected QueuedTransaction, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_and_confirm_without_queue() {
    let (client, mock) = mock_client();
    let client = client.without_queue();
    mock.set_json("/live/v1/broadcast-transaction", json!({
        "peersBroadcasted": 1, "encodedTransaction": "", "transactionId": "net-tx"
    }));
    mock.set_json("/query/v1/getLastProcessedTick", json!({ "lastProcessedTick": 50 }));
    mock.push_response("/query/v1/getTransactionByHash", record_response("net-tx", 42));

    let receipt = client.send_and_confirm(&params(42)).await.unwrap();
    assert!(receipt.queue_item.is_none());
    // The direct path keeps the confirmation it already fetched.
    assert_eq!(receipt.confirmation.unwrap().tick_number, Tick::new(42));
}

#[tokio::test]
async fn test_send_queued_returns_terminal_item() {
    let (client, mock) = mock_client();
    mock.set_json("/live/v1/broadcast-transaction", json!({
        "peersBroadcasted": 1, "encodedTransaction": "", "transactionId": "net-tx"
    }));
    mock.set_json("/query/v1/getLastProcessedTick", json!({ "lastProcessedTick": 50 }));
    mock.push_response("/query/v1/getTransactionByHash", record_response("net-tx", 42));

    let item = client.send_queued(&params(42)).await.unwrap();
    assert_eq!(item.status, QueueStatus::Confirmed);
    assert!(item.result.is_some());
    assert!(item.tx_id.is_some());
}

#[tokio::test]
async fn test_queue_serializes_same_source_sends() {
    let (client, mock) = mock_client();
    assert_eq!(
        client.queue().unwrap().policy(),
        QueuePolicy::WaitForConfirm
    );

    mock.push_response("/live/v1/broadcast-transaction", broadcast_response("net-tx1"));
    mock.push_response("/live/v1/broadcast-transaction", broadcast_response("net-tx2"));
    mock.set_json("/query/v1/getLastProcessedTick", json!({ "lastProcessedTick": 50 }));
    mock.push_response("/query/v1/getTransactionByHash", record_response("net-tx1", 10));
    mock.push_response("/query/v1/getTransactionByHash", record_response("net-tx2", 11));

    let params10 = params(10);
    let params11 = params(11);
    let (first, second) = tokio::join!(
        client.send_queued(&params10),
        client.send_queued(&params11),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.status, QueueStatus::Confirmed);
    assert_eq!(second.status, QueueStatus::Confirmed);

    let net1 = first.result.unwrap().network_tx_id;
    let net2 = second.result.unwrap().network_tx_id;
    assert_ne!(net1, net2);

    // The second broadcast only went out after the first item's
    // confirmation lookup.
    let all = mock.requests();
    let broadcasts: Vec<usize> = all
        .iter()
        .enumerate()
        .filter(|(_, r)| r.path == "/live/v1/broadcast-transaction")
        .map(|(i, _)| i)
        .collect();
    let first_lookup = all
        .iter()
        .position(|r| r.path == "/query/v1/getTransactionByHash")
        .unwrap();
    assert_eq!(broadcasts.len(), 2);
    assert!(broadcasts[1] > first_lookup);
}

#[tokio::test]
async fn test_suggested_target_tick_guardrails() {
    let (client, mock) = mock_client();
    mock.set_json("/live/v1/tick-info", json!({ "tickInfo": { "tick": 100 } }));

    assert_eq!(
        client.suggested_target_tick(Some(10)).await.unwrap(),
        Tick::new(110)
    );
    let err = client.suggested_target_tick(Some(0)).await.unwrap_err();
    assert!(matches!(err, SdkError::TickOffsetOutOfRange { .. }));
}

#[tokio::test]
async fn test_balance_query() {
    let (client, mock) = mock_client();
    let id = destination();
    mock.set_json(
        &format!("/live/v1/balances/{id}"),
        json!({ "balance": { "id": id.as_str(), "balance": "123456789012345678" } }),
    );

    let balance = client.rpc().balance(&id).await.unwrap();
    assert_eq!(balance.balance, 123_456_789_012_345_678);
}
