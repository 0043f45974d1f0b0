//! # fugue-sdk
//!
//! Client SDK for the Fugue tick-based ledger.
//!
//! ## Features
//!
//! - **FugueClient**: high-level façade for transfers and contract calls
//! - **RpcClient**: typed access to the live and archive RPC surfaces
//! - **TxBuilder**: seed-sourced transaction building and signing
//! - **TxQueue**: per-source serialization with preemption policies
//! - **InterfaceRegistry**: declarative contract interfaces with codecs
//! - **LogStream**: cursor-resumable contract log streaming
//! - **SeedVault**: passphrase-encrypted seed storage
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fugue_sdk::{FugueClient, SeedSource, TransferParams};
//! use fugue_primitives::Identity;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FugueClient::connect("https://rpc.fugue.example.org")?;
//!
//!     let to: Identity = "BZBQFLLBNCXEMGLOBHUVFTLUPLVCPQUASSILFABOFFBCADQSSUPNWLZBQEXK"
//!         .parse()?;
//!     let params = TransferParams::transfer(
//!         SeedSource::Seed("your seed here".to_string()),
//!         to,
//!         1_000,
//!     );
//!
//!     let receipt = client.send_and_confirm_with_receipt(&params).await?;
//!     println!(
//!         "confirmed at tick {:?}",
//!         receipt.confirmation.map(|r| r.tick_number)
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Contract Interaction
//!
//! ```rust,no_run
//! use fugue_sdk::{FugueClient, InterfaceFile, QueryCall};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let interface = InterfaceFile::from_json(r#"{
//!     "contract": { "name": "QX", "contractIndex": 1 },
//!     "entries": [
//!         { "kind": "function", "name": "Fees", "inputType": 1,
//!           "inputSize": 0, "outputSize": 16 }
//!     ]
//! }"#)?;
//!
//! let client = FugueClient::connect("https://rpc.fugue.example.org")?
//!     .with_interfaces(vec![interface], Default::default())?;
//!
//! let fees = client.contract("QX")?.query("Fees", QueryCall::default()).await?;
//! println!("{} bytes in {} attempt(s)", fees.response.len(), fees.attempts);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assets;
mod client;
mod confirm;
mod contract_query;
mod cursor;
mod error;
pub mod interfaces;
mod logstream;
mod queue;
mod retry;
mod rpc;
pub mod send_many;
mod tick;
mod transport;
mod tx_builder;
pub mod types;
pub mod vault;

// Re-export main types
pub use client::{FugueClient, FugueClientConfig, TransferParams, TransferReceipt};
pub use confirm::{wait_for_confirmation, ConfirmOptions};
pub use contract_query::{query_contract_raw, RawQuery, RawQueryResult};
pub use cursor::{cursor_key, CursorStore, FileCursorStore, LogCursor, MemoryCursorStore};
pub use error::SdkError;
pub use interfaces::{
    exchange_codecs, exchange_interface, CodecError, CodecRegistry, ContractCodec,
    ContractDescriptor, ContractHandle, ContractQueryResult, EntryKind, FieldType,
    InterfaceEntry, InterfaceFile, InterfaceRegistry, LayoutCodec, ProcedureCall, QueryCall,
};
pub use logstream::{
    mock_connector, LogConnector, LogEvent, LogHandlers, LogSocket, LogStream, LogStreamConfig,
    LogSubscription, MockConnector, MockStreamHandle, WsConnector,
};
pub use queue::{QueueItem, QueuePolicy, QueueStatus, TxQueue};
pub use retry::Backoff;
pub use rpc::{RpcClient, RpcHooks};
pub use tick::{suggested_target_tick, TickOffsets};
pub use transport::{HttpTransport, MockResponse, MockTransport, RpcRequest, RpcResponse};

/// Re-export Transport trait for custom implementations
pub use transport::Transport;
pub use tx_builder::{SeedSource, SignedTransaction, TxBuilder};
pub use vault::{AddSeed, ImportMode, ImportOptions, SeedVault, StoreOpenOptions, VaultOpenOptions};

// Re-export primitives for convenience
pub use fugue_primitives::{Epoch, Identity, PublicKey, Tick};
