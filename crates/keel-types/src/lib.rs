//! # keel-types
//!
//! Chain data types shared by the keel SDK.
//!
//! This crate provides:
//! - [`LegacyTx`] and [`SignedTransaction`]: EIP-155 transactions and their RLP codec
//! - [`TransactionReceipt`] and [`Log`]: receipts as returned by `eth_getTransactionReceipt`
//! - [`BlockView`] and [`TransactionView`]: blocks and transactions as returned by the node
//! - [`quantity`]: serde helpers for JSON-RPC hex quantities and data

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod quantity;
pub mod receipt;
pub mod transaction;

pub use block::{BlockTransactions, BlockView, TransactionView};
pub use receipt::{Log, TransactionReceipt, TxStatus};
pub use transaction::{LegacyTx, SignedTransaction, TxCodecError, TxSignature};
