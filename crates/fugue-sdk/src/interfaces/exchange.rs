//! Canned interface for the network's asset-exchange contract
//!
//! Saves callers from re-declaring the well-known entries by hand; the
//! layouts match the contract's packed structs, so the codec registry can
//! validate them at construction.

use super::layout::{FieldType, LayoutCodec};
use super::{CodecRegistry, ContractDescriptor, EntryKind, InterfaceEntry, InterfaceFile};

use std::sync::Arc;

/// Interface file for the exchange contract at the given live-surface index.
pub fn exchange_interface(contract_index: u32) -> InterfaceFile {
    InterfaceFile {
        contract: ContractDescriptor {
            name: "QX".to_string(),
            contract_index: Some(contract_index),
            contract_public_key_hex: None,
            contract_id: None,
        },
        entries: vec![
            InterfaceEntry {
                kind: EntryKind::Function,
                name: "Fees".to_string(),
                input_type: 1,
                input_size: Some(0),
                output_size: Some(12),
            },
            InterfaceEntry {
                kind: EntryKind::Function,
                name: "AssetAskOrders".to_string(),
                input_type: 2,
                input_size: Some(48),
                output_size: None,
            },
            InterfaceEntry {
                kind: EntryKind::Function,
                name: "AssetBidOrders".to_string(),
                input_type: 3,
                input_size: Some(48),
                output_size: None,
            },
            InterfaceEntry {
                kind: EntryKind::Procedure,
                name: "TransferShareOwnershipAndPossession".to_string(),
                input_type: 2,
                input_size: Some(80),
                output_size: None,
            },
            InterfaceEntry {
                kind: EntryKind::Procedure,
                name: "AddToAskOrder".to_string(),
                input_type: 5,
                input_size: Some(56),
                output_size: None,
            },
        ],
    }
}

/// Layout codecs for the typed exchange entries.
pub fn exchange_codecs() -> CodecRegistry {
    let fees = LayoutCodec::new()
        .output_field("assetIssuanceFee", FieldType::U32)
        .output_field("transferFee", FieldType::U32)
        .output_field("tradeFee", FieldType::U32);

    let order_query = LayoutCodec::new()
        .input_field("issuer", FieldType::Identity)
        .input_field("assetName", FieldType::AssetName)
        .input_field("offset", FieldType::U64);

    let transfer_share = LayoutCodec::new()
        .input_field("issuer", FieldType::Identity)
        .input_field("newOwner", FieldType::Identity)
        .input_field("assetName", FieldType::AssetName)
        .input_field("amount", FieldType::I64);

    let add_ask = LayoutCodec::new()
        .input_field("issuer", FieldType::Identity)
        .input_field("assetName", FieldType::AssetName)
        .input_field("price", FieldType::I64)
        .input_field("numberOfShares", FieldType::I64);

    CodecRegistry::new()
        .with(EntryKind::Function, "Fees", Arc::new(fees))
        .with(EntryKind::Function, "AssetAskOrders", Arc::new(order_query.clone()))
        .with(EntryKind::Function, "AssetBidOrders", Arc::new(order_query))
        .with(
            EntryKind::Procedure,
            "TransferShareOwnershipAndPossession",
            Arc::new(transfer_share),
        )
        .with(EntryKind::Procedure, "AddToAskOrder", Arc::new(add_ask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::InterfaceRegistry;
    use std::collections::HashMap;

    #[test]
    fn test_codecs_validate_against_interface() {
        let codecs = HashMap::from([("QX".to_string(), exchange_codecs())]);
        InterfaceRegistry::with_codecs(vec![exchange_interface(1)], codecs).unwrap();
    }

    #[test]
    fn test_layout_sizes_match_declared_entry_sizes() {
        let interface = exchange_interface(1);

        let order_query = LayoutCodec::new()
            .input_field("issuer", FieldType::Identity)
            .input_field("assetName", FieldType::AssetName)
            .input_field("offset", FieldType::U64);
        let ask_orders = interface.entry(EntryKind::Function, "AssetAskOrders").unwrap();
        assert_eq!(order_query.encoded_input_size(), ask_orders.input_size);

        let transfer = interface
            .entry(EntryKind::Procedure, "TransferShareOwnershipAndPossession")
            .unwrap();
        assert_eq!(transfer.input_size, Some(80));

        let add_ask = interface.entry(EntryKind::Procedure, "AddToAskOrder").unwrap();
        assert_eq!(add_ask.input_size, Some(56));
    }
}
