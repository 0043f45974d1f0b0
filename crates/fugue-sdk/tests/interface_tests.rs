//! Interface-registry integration tests
//!
//! Registry construction rules, the input-size guard, output-size
//! delegation to the query helper, codecs, and procedure building.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use fugue_primitives::Tick;
use fugue_sdk::{
    CodecError, CodecRegistry, ContractCodec, ContractDescriptor, EntryKind, FugueClient,
    InterfaceEntry, InterfaceFile, MockResponse, MockTransport, ProcedureCall, QueryCall,
    SdkError, SeedSource,
};
use serde_json::{json, Value};

const SEED: &str = "interfacetestseedfixtureqwertzuiopasdfghjklyxcvbnmqwertz";

struct U64Codec;

impl ContractCodec for U64Codec {
    fn encode(&self, _entry: &InterfaceEntry, value: &Value) -> Result<Vec<u8>, CodecError> {
        value
            .as_u64()
            .map(|v| v.to_le_bytes().to_vec())
            .ok_or_else(|| "expected an unsigned integer".into())
    }

    fn decode(&self, _entry: &InterfaceEntry, bytes: &[u8]) -> Result<Value, CodecError> {
        let eight: [u8; 8] = bytes
            .get(..8)
            .and_then(|s| s.try_into().ok())
            .ok_or("response shorter than 8 bytes")?;
        Ok(json!(u64::from_le_bytes(eight)))
    }
}

fn qx_interface() -> InterfaceFile {
    InterfaceFile {
        contract: ContractDescriptor {
            name: "QX".to_string(),
            contract_index: Some(1),
            contract_public_key_hex: None,
            contract_id: None,
        },
        entries: vec![
            InterfaceEntry {
                kind: EntryKind::Function,
                name: "Fees".to_string(),
                input_type: 1,
                input_size: Some(0),
                output_size: Some(16),
            },
            InterfaceEntry {
                kind: EntryKind::Function,
                name: "AssetAskOrders".to_string(),
                input_type: 3,
                input_size: Some(8),
                output_size: None,
            },
        ],
    }
}

fn vault_contract_interface() -> InterfaceFile {
    let contract_id = fugue_crypto::identity_from_public_key(
        &fugue_primitives::PublicKey::from_bytes([9u8; 32]),
    );
    InterfaceFile {
        contract: ContractDescriptor {
            name: "QVAULT".to_string(),
            contract_index: None,
            contract_public_key_hex: None,
            contract_id: Some(contract_id),
        },
        entries: vec![InterfaceEntry {
            kind: EntryKind::Procedure,
            name: "Deposit".to_string(),
            input_type: 7,
            input_size: Some(8),
            output_size: None,
        }],
    }
}

fn client_with(files: Vec<InterfaceFile>) -> (FugueClient, Arc<MockTransport>) {
    let mock = Arc::new(MockTransport::new());
    let client = FugueClient::with_transport(mock.clone())
        .with_interfaces(files, HashMap::new())
        .unwrap();
    (client, mock)
}

fn contract_response(bytes: &[u8]) -> MockResponse {
    MockResponse::json(json!({
        "responseData": base64::engine::general_purpose::STANDARD.encode(bytes)
    }))
}

#[tokio::test]
async fn test_query_delegates_declared_output_size() {
    let (client, mock) = client_with(vec![qx_interface()]);
    // First response is short of the declared 16 bytes, so the helper must
    // re-issue; that retry proves outputSize reached the query loop.
    mock.push_response("/live/v1/querySmartContract", contract_response(&[1u8; 4]));
    mock.push_response("/live/v1/querySmartContract", contract_response(&[1u8; 16]));

    let contract = client.contract("QX").unwrap();
    let result = contract
        .query(
            "Fees",
            QueryCall {
                retry_delay: Some(std::time::Duration::from_millis(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.attempts, 2);
    assert_eq!(result.response.len(), 16);

    let body = mock.requests_for("/live/v1/querySmartContract")[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(body["contractIndex"], 1);
    assert_eq!(body["inputType"], 1);
    assert_eq!(body["inputSize"], 0);
}

#[tokio::test]
async fn test_input_size_guard_issues_no_rpc() {
    let (client, mock) = client_with(vec![qx_interface()]);
    let contract = client.contract("QX").unwrap();

    let err = contract
        .query("Fees", QueryCall::bytes(vec![1, 2, 3]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SdkError::InputSizeMismatch { expected: 0, actual: 3 }
    ));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_size_mismatch_escape_for_queries() {
    let (client, mock) = client_with(vec![qx_interface()]);
    mock.push_response("/live/v1/querySmartContract", contract_response(&[0u8; 16]));

    let contract = client.contract("QX").unwrap();
    let result = contract
        .query(
            "Fees",
            QueryCall {
                input: Some(vec![1, 2, 3]),
                allow_size_mismatch: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(result.attempts, 1);
}

#[tokio::test]
async fn test_entry_not_found_is_typed() {
    let (client, _mock) = client_with(vec![qx_interface()]);
    let contract = client.contract("QX").unwrap();

    let err = contract.query("NoSuch", QueryCall::default()).await.unwrap_err();
    match err {
        SdkError::EntryNotFound { contract, kind, name } => {
            assert_eq!(contract, "QX");
            assert_eq!(kind, EntryKind::Function);
            assert_eq!(name, "NoSuch");
        }
        other => panic!("expected EntryNotFound, got {other:?}"),
    }

    // Procedures resolve in their own namespace.
    assert!(contract.entry(EntryKind::Procedure, "Fees").is_err());
}

#[test]
fn test_codec_validation_fails_at_construction() {
    let mock = Arc::new(MockTransport::new());
    let codecs = HashMap::from([(
        "QX".to_string(),
        CodecRegistry::new().with(EntryKind::Function, "Phantom", Arc::new(U64Codec)),
    )]);

    let err = FugueClient::with_transport(mock)
        .with_interfaces(vec![qx_interface()], codecs)
        .unwrap_err();
    assert!(matches!(err, SdkError::CodecValidation(_)));
}

#[tokio::test]
async fn test_registry_codec_encodes_and_decodes() {
    let mock = Arc::new(MockTransport::new());
    let codecs = HashMap::from([(
        "QX".to_string(),
        CodecRegistry::new().with(EntryKind::Function, "AssetAskOrders", Arc::new(U64Codec)),
    )]);
    let client = FugueClient::with_transport(mock.clone())
        .with_interfaces(vec![qx_interface()], codecs)
        .unwrap();

    mock.push_response(
        "/live/v1/querySmartContract",
        contract_response(&42u64.to_le_bytes()),
    );

    let contract = client.contract("QX").unwrap();
    let decoded = contract
        .query_value("AssetAskOrders", QueryCall::value(json!(7)))
        .await
        .unwrap();
    assert_eq!(decoded, json!(42));

    // The codec-encoded input satisfied the declared 8-byte input size.
    let body = mock.requests_for("/live/v1/querySmartContract")[0]
        .body
        .clone()
        .unwrap();
    let sent = base64::engine::general_purpose::STANDARD
        .decode(body["requestData"].as_str().unwrap())
        .unwrap();
    assert_eq!(sent, 7u64.to_le_bytes());
}

#[tokio::test]
async fn test_value_without_codec_is_codec_missing() {
    let (client, _mock) = client_with(vec![qx_interface()]);
    let contract = client.contract("QX").unwrap();

    let err = contract
        .query("AssetAskOrders", QueryCall::value(json!(7)))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::CodecMissing { .. }));

    let err = contract
        .query_value("Fees", QueryCall::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::CodecMissing { .. }));
}

#[tokio::test]
async fn test_codec_errors_are_wrapped() {
    let (client, _mock) = client_with(vec![qx_interface()]);
    let contract = client.contract("QX").unwrap();

    let err = contract
        .query(
            "AssetAskOrders",
            QueryCall {
                value: Some(json!("not a number")),
                codec: Some(Arc::new(U64Codec)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        SdkError::Codec { operation, entry, message } => {
            assert_eq!(operation, "encode");
            assert_eq!(entry, "AssetAskOrders");
            assert!(message.contains("unsigned integer"));
        }
        other => panic!("expected Codec error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_build_procedure_targets_contract_identity() {
    let (client, _mock) = client_with(vec![vault_contract_interface()]);
    let contract = client.contract("QVAULT").unwrap();

    let mut call = ProcedureCall::bytes(
        SeedSource::Seed(SEED.to_string()),
        5u64.to_le_bytes().to_vec(),
    );
    call.amount = 100;
    call.target_tick = Some(Tick::new(9000));

    let signed = contract
        .build_procedure_transaction("Deposit", call)
        .await
        .unwrap();
    assert_eq!(signed.target_tick, Tick::new(9000));

    // Destination bytes are the contract's public key; input type is the
    // entry's.
    assert_eq!(&signed.bytes[32..64], &[9u8; 32]);
    assert_eq!(&signed.bytes[64..72], &100u64.to_le_bytes());
    assert_eq!(&signed.bytes[76..78], &7u16.to_le_bytes());
}

#[tokio::test]
async fn test_procedure_size_has_no_escape() {
    let (client, _mock) = client_with(vec![vault_contract_interface()]);
    let contract = client.contract("QVAULT").unwrap();

    let mut call = ProcedureCall::bytes(SeedSource::Seed(SEED.to_string()), vec![1, 2]);
    call.target_tick = Some(Tick::new(9000));

    let err = contract
        .build_procedure_transaction("Deposit", call)
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::InputSizeMismatch { expected: 8, actual: 2 }));
}

#[tokio::test]
async fn test_procedure_via_public_key_hex() {
    let mut interface = vault_contract_interface();
    interface.contract.contract_id = None;
    interface.contract.contract_public_key_hex = Some(hex::encode([9u8; 32]));

    let (client, _mock) = client_with(vec![interface]);
    let contract = client.contract("QVAULT").unwrap();
    let identity = contract.contract_identity().unwrap();

    let expected = fugue_crypto::identity_from_public_key(
        &fugue_primitives::PublicKey::from_bytes([9u8; 32]),
    );
    assert_eq!(identity, expected);
}

#[tokio::test]
async fn test_procedure_requires_destination() {
    let mut interface = vault_contract_interface();
    interface.contract.contract_id = None;

    let (client, _mock) = client_with(vec![interface]);
    let contract = client.contract("QVAULT").unwrap();
    let err = contract.contract_identity().unwrap_err();
    assert!(matches!(err, SdkError::InterfaceInvalid { .. }));
}

#[tokio::test]
async fn test_bad_public_key_hex_length() {
    let mut interface = vault_contract_interface();
    interface.contract.contract_id = None;
    interface.contract.contract_public_key_hex = Some(hex::encode([9u8; 16]));

    let (client, _mock) = client_with(vec![interface]);
    let contract = client.contract("QVAULT").unwrap();
    let err = contract.contract_identity().unwrap_err();
    assert!(matches!(err, SdkError::InterfaceInvalid { .. }));
}

#[tokio::test]
async fn test_canned_exchange_interface_end_to_end() {
    use fugue_sdk::{exchange_codecs, exchange_interface};

    let mock = Arc::new(MockTransport::new());
    let codecs = HashMap::from([("QX".to_string(), exchange_codecs())]);
    let client = FugueClient::with_transport(mock.clone())
        .with_interfaces(vec![exchange_interface(1)], codecs)
        .unwrap();

    // 12 bytes: three u32 fee fields.
    let mut fees = Vec::new();
    fees.extend_from_slice(&1_000_000u32.to_le_bytes());
    fees.extend_from_slice(&1_000u32.to_le_bytes());
    fees.extend_from_slice(&5_000_000u32.to_le_bytes());
    mock.push_response("/live/v1/querySmartContract", contract_response(&fees));

    let contract = client.contract("QX").unwrap();
    let decoded = contract
        .query_value("Fees", QueryCall::default())
        .await
        .unwrap();
    assert_eq!(decoded["assetIssuanceFee"], 1_000_000);
    assert_eq!(decoded["transferFee"], 1_000);
    assert_eq!(decoded["tradeFee"], 5_000_000);
}

#[test]
fn test_duplicate_contracts_rejected() {
    let mock = Arc::new(MockTransport::new());
    let err = FugueClient::with_transport(mock)
        .with_interfaces(vec![qx_interface(), qx_interface()], HashMap::new())
        .unwrap_err();
    assert!(matches!(err, SdkError::CodecValidation(_)));
}
