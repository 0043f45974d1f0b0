//! Transaction-builder and payload-encoder integration tests

use fugue_primitives::{PublicKey, Tick};
use fugue_sdk::send_many::{encode_send_many, SendManyTransfer};
use fugue_sdk::{SdkError, TxBuilder};

const SEED: &str = "jvhbuildertestseedfixturebcfygqwertzuiopasdfghjklyxcvbnm";

#[test]
fn test_simple_transfer_is_deterministic() {
    let destination = fugue_crypto::identity_from_public_key(
        &fugue_crypto::public_key_from_seed("buildertestdestination").unwrap(),
    );

    let builder = TxBuilder::new()
        .source_seed(SEED)
        .to(destination.clone())
        .amount(1)
        .target_tick(Tick::new(12345));

    let built = builder.build().unwrap();
    assert_eq!(built.target_tick, Tick::new(12345));

    // The bytes equal what the signer produces for the same inputs...
    let header = fugue_crypto::TxHeader {
        source_public_key: fugue_crypto::public_key_from_seed(SEED).unwrap(),
        destination_public_key: fugue_crypto::public_key_from_identity(&destination).unwrap(),
        amount: 1,
        tick: 12345,
        input_type: 0,
        input: Vec::new(),
    };
    let private = fugue_crypto::private_key_from_seed(SEED).unwrap();
    let expected = fugue_crypto::build_signed_transaction(&header, &private).unwrap();
    assert_eq!(built.bytes, expected);

    // ...and the id equals the external hash of those bytes.
    assert_eq!(built.tx_id, fugue_crypto::transaction_id(&expected));
}

#[test]
fn test_identity_public_key_round_trip() {
    for byte in [0u8, 1, 33, 0x7f, 0xff] {
        let pk = PublicKey::from_bytes([byte; 32]);
        let identity = fugue_crypto::identity_from_public_key(&pk);
        assert_eq!(identity.as_str().len(), 60);
        assert_eq!(fugue_crypto::public_key_from_identity(&identity).unwrap(), pk);
    }

    // And through a real derived key.
    let pk = fugue_crypto::public_key_from_seed(SEED).unwrap();
    let identity = fugue_crypto::identity_from_public_key(&pk);
    assert_eq!(fugue_crypto::public_key_from_identity(&identity).unwrap(), pk);
}

#[test]
fn test_send_many_reference_vector() {
    let destination = fugue_crypto::identity_from_public_key(&PublicKey::from_bytes([0xab; 32]));
    let payload = encode_send_many(&[SendManyTransfer {
        destination: destination.clone(),
        amount: 1,
    }])
    .unwrap();

    assert_eq!(payload.len(), 1000);
    assert_eq!(
        &payload[..32],
        fugue_crypto::public_key_from_identity(&destination)
            .unwrap()
            .as_bytes()
    );
    assert_eq!(&payload[800..808], &[1, 0, 0, 0, 0, 0, 0, 0]);
    let zeroes = payload[32..800].iter().chain(&payload[808..]);
    assert!(zeroes.into_iter().all(|&b| b == 0));
}

#[test]
fn test_send_many_rejects_26_transfers() {
    let transfers: Vec<SendManyTransfer> = (1..=26)
        .map(|i| SendManyTransfer {
            destination: fugue_crypto::identity_from_public_key(&PublicKey::from_bytes([i; 32])),
            amount: i64::from(i),
        })
        .collect();

    assert!(matches!(
        encode_send_many(&transfers),
        Err(SdkError::TooManyTransfers { got: 26, .. })
    ));
}

#[test]
fn test_transfer_with_contract_input() {
    let destination =
        fugue_crypto::identity_from_public_key(&PublicKey::from_bytes([0x05; 32]));

    let built = TxBuilder::new()
        .source_seed(SEED)
        .to(destination)
        .amount(0)
        .target_tick(Tick::new(500))
        .input_type(2)
        .input(vec![0xde, 0xad])
        .build()
        .unwrap();

    // input type at 76..78, declared size at 78..80, payload follows.
    assert_eq!(&built.bytes[76..78], &2u16.to_le_bytes());
    assert_eq!(&built.bytes[78..80], &2u16.to_le_bytes());
    assert_eq!(&built.bytes[80..82], &[0xde, 0xad]);
}
