//! # keel-sdk
//!
//! Client toolkit for Ethereum-compatible nodes over JSON-RPC.
//!
//! ## Features
//!
//! - **ChainClient**: typed reads, gas estimation, broadcast and receipt waits
//! - **TxBuilder**: resolves nonce, gas and gas price, then signs (EIP-155)
//! - **NonceManager**: per-sender nonce sequencing for concurrent builds
//! - **Contract**: ABI-driven calls and transactions, ERC-20 helpers
//! - **DeployPipeline**: compile, sign, broadcast and confirm contract creations
//! - **ABI**: Solidity ABI encoding and decoding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keel_sdk::{transfer, ChainClient, PrivateKey, TransferRequest, TxBuilder};
//! use keel_sdk::types::BlockId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChainClient::connect("http://localhost:8545").await?;
//!     let key = PrivateKey::from_hex(
//!         "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
//!     )?;
//!
//!     let balance = client.get_balance_in_ether(&key.address(), BlockId::Latest).await?;
//!     println!("balance: {} ETH", balance);
//!
//!     let request = TransferRequest::new(
//!         key.address().to_hex(),
//!         "0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d",
//!         "0.02",
//!         "21000",
//!     );
//!     let sent = transfer(&TxBuilder::new(&client), &request, &key).await?;
//!     println!("sent {}", sent.hash);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Contract Interaction
//!
//! ```rust,no_run
//! use keel_sdk::{token_balance, ChainClient, Contract};
//! use keel_sdk::abi::Token;
//! use keel_sdk::types::BlockId;
//! use keel_primitives::Address;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChainClient::connect("http://localhost:8545").await?;
//!
//!     let token = Address::from_hex("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")?;
//!     let owner = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d")?;
//!
//!     let usdc = Contract::erc20(token);
//!     let symbol = usdc.call(&client, "symbol", &[], BlockId::Latest).await?;
//!     let balance = token_balance(&client, &usdc, &owner).await?;
//!     println!("{} {:?}", balance, symbol.first().and_then(Token::as_str));
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod client;
pub mod compiler;
pub mod config;
pub mod contract;
pub mod deploy;
mod error;
mod nonce;
mod transfer;
mod transport;
mod tx_builder;
pub mod types;
pub mod units;

// Re-export main types
pub use client::ChainClient;
pub use compiler::{CompiledArtifact, CompilerService, ContractDescriptor, MockCompiler, SolcCompiler};
pub use config::ClientConfig;
pub use contract::{token_balance, Contract};
pub use deploy::{DeployError, DeployPipeline, DeployRequest, DeployStage, Deployment};
pub use error::SdkError;
pub use nonce::{NonceManager, NonceReservation};
pub use transfer::{transfer, TransferRequest};
pub use tx_builder::{ResolvedTransaction, TransactionIntent, TxBuilder};
pub use units::UnitAmount;

/// Re-export the transport capability for custom implementations
pub use transport::{ChainTransport, MockTransport, RecordedCall};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export primitives for convenience
pub use keel_crypto::PrivateKey;
pub use keel_primitives::{Address, BlockNumber, Gas, Nonce, H256, U256};
pub use keel_types::{Log, SignedTransaction, TransactionReceipt, TxStatus};
pub use tokio_util::sync::CancellationToken;
