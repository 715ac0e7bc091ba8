//! ChainClient - typed wrapper over one JSON-RPC endpoint

use bytes::Bytes;
use keel_primitives::{Address, H256, U256};
use keel_types::quantity;
use keel_types::{BlockView, TransactionReceipt, TransactionView};
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::transport::{deserialize_response, ChainTransport, MockTransport};
use crate::types::{BlockId, CallRequest, PollConfig};
use crate::units::UnitAmount;
use crate::SdkError;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Node error code for a reverted execution
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Client for one node endpoint
///
/// Holds no mutable state besides the cached chain id, so reads can run
/// concurrently through shared references.
pub struct ChainClient {
    transport: Box<dyn ChainTransport>,
    chain_id: OnceCell<u64>,
}

impl ChainClient {
    /// Connect over HTTP and fetch the chain id
    #[cfg(feature = "http")]
    pub async fn connect(url: &str) -> Result<Self, SdkError> {
        let config = ClientConfig {
            rpc_url: url.to_string(),
            ..Default::default()
        };
        let client = Self::from_config(&config)?;
        client.chain_id().await?;
        Ok(client)
    }

    /// Build an HTTP client from configuration. No request is made.
    #[cfg(feature = "http")]
    pub fn from_config(config: &ClientConfig) -> Result<Self, SdkError> {
        let transport = HttpTransport::new(&config.rpc_url, config.request_timeout())?;
        let client = Self::with_transport(transport);
        Ok(match config.chain_id {
            Some(id) => client.with_chain_id(id),
            None => client,
        })
    }

    /// Create a new client with mock transport (for testing)
    pub fn new_mock() -> Self {
        Self::with_transport(MockTransport::new()).with_chain_id(1)
    }

    /// Create a client with a custom transport
    pub fn with_transport(transport: impl ChainTransport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            chain_id: OnceCell::new(),
        }
    }

    /// Pin the chain id instead of asking the node
    pub fn with_chain_id(self, chain_id: u64) -> Self {
        Self {
            transport: self.transport,
            chain_id: OnceCell::new_with(Some(chain_id)),
        }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        tracing::debug!("rpc {}", method);
        let value = self.transport.request_json(method, params).await?;
        deserialize_response(value)
    }

    async fn request_u64(&self, method: &str, params: Vec<Value>) -> Result<u64, SdkError> {
        let result: String = self.request(method, params).await?;
        quantity::parse_u64(&result).map_err(SdkError::Serialization)
    }

    async fn request_u256(&self, method: &str, params: Vec<Value>) -> Result<U256, SdkError> {
        let result: String = self.request(method, params).await?;
        quantity::parse_u256(&result).map_err(SdkError::Serialization)
    }

    async fn request_bytes(&self, method: &str, params: Vec<Value>) -> Result<Bytes, SdkError> {
        let result: String = self.request(method, params).await?;
        quantity::parse_bytes(&result).map_err(SdkError::Serialization)
    }

    // ==================== Chain Info ====================

    /// Get the chain ID, cached after the first successful lookup
    pub async fn chain_id(&self) -> Result<u64, SdkError> {
        self.chain_id
            .get_or_try_init(|| self.request_u64("eth_chainId", vec![]))
            .await
            .copied()
    }

    /// Get the current gas price in wei
    pub async fn gas_price(&self) -> Result<U256, SdkError> {
        self.request_u256("eth_gasPrice", vec![]).await
    }

    /// Get the current block number
    pub async fn block_number(&self) -> Result<u64, SdkError> {
        self.request_u64("eth_blockNumber", vec![]).await
    }

    // ==================== Account Queries ====================

    /// Get the balance of an address in wei
    pub async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        self.request_u256(
            "eth_getBalance",
            vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
        )
        .await
    }

    /// Get the balance of an address in ether, exact to the wei
    pub async fn get_balance_in_ether(
        &self,
        address: &Address,
        block: BlockId,
    ) -> Result<UnitAmount, SdkError> {
        self.get_balance(address, block).await.map(UnitAmount::ether)
    }

    /// Get the nonce (transaction count) of an address
    pub async fn get_nonce(&self, address: &Address, block: BlockId) -> Result<u64, SdkError> {
        self.request_u64(
            "eth_getTransactionCount",
            vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
        )
        .await
    }

    /// Get the code at an address
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        self.request_bytes(
            "eth_getCode",
            vec![Value::String(address.to_hex()), serde_json::to_value(block)?],
        )
        .await
    }

    // ==================== Block Queries ====================

    /// Get a block by number, with full transaction objects
    pub async fn get_block(&self, block: BlockId) -> Result<Option<BlockView>, SdkError> {
        self.request(
            "eth_getBlockByNumber",
            vec![serde_json::to_value(block)?, Value::Bool(true)],
        )
        .await
    }

    /// Get a block by hash, with full transaction objects
    pub async fn get_block_by_hash(&self, hash: &H256) -> Result<Option<BlockView>, SdkError> {
        self.request(
            "eth_getBlockByHash",
            vec![Value::String(hash.to_hex()), Value::Bool(true)],
        )
        .await
    }

    /// Number of transactions in a block
    pub async fn get_block_transaction_count(&self, block: BlockId) -> Result<u64, SdkError> {
        self.request_u64(
            "eth_getBlockTransactionCountByNumber",
            vec![serde_json::to_value(block)?],
        )
        .await
    }

    // ==================== Transaction Queries ====================

    /// Get a transaction by hash
    pub async fn get_transaction(&self, hash: &H256) -> Result<Option<TransactionView>, SdkError> {
        self.request("eth_getTransactionByHash", vec![Value::String(hash.to_hex())])
            .await
    }

    /// Get the transaction at `index` within a block
    pub async fn get_transaction_from_block(
        &self,
        block: BlockId,
        index: u64,
    ) -> Result<Option<TransactionView>, SdkError> {
        self.request(
            "eth_getTransactionByBlockNumberAndIndex",
            vec![
                serde_json::to_value(block)?,
                Value::String(quantity::format_u64(index)),
            ],
        )
        .await
    }

    /// Transactions in the node's pending pool
    pub async fn get_pending_transactions(&self) -> Result<Vec<TransactionView>, SdkError> {
        let pending: Option<Vec<TransactionView>> =
            self.request("eth_pendingTransactions", vec![]).await?;
        Ok(pending.unwrap_or_default())
    }

    /// Get a transaction receipt; `None` while the transaction is unmined
    pub async fn get_receipt(&self, hash: &H256) -> Result<Option<TransactionReceipt>, SdkError> {
        self.request("eth_getTransactionReceipt", vec![Value::String(hash.to_hex())])
            .await
    }

    /// Poll for a receipt until it appears, `poll.timeout` elapses, or
    /// `cancel` fires.
    ///
    /// An RPC error while polling ends the wait with that error.
    pub async fn wait_for_receipt(
        &self,
        hash: &H256,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, SdkError> {
        let deadline = Instant::now() + poll.timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(SdkError::Cancelled(format!("receipt wait for {}", hash)));
            }

            if let Some(receipt) = self.get_receipt(hash).await? {
                return Ok(receipt);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("receipt for {} not found after {:?}", hash, poll.timeout);
                return Err(SdkError::Timeout(format!(
                    "receipt for {} not found after {:?}",
                    hash, poll.timeout
                )));
            }

            let delay = poll.interval.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(SdkError::Cancelled(format!("receipt wait for {}", hash)));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    // ==================== Transaction Submission ====================

    /// Broadcast a signed payload; returns once the node accepts it
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, SdkError> {
        let result: String = self
            .request(
                "eth_sendRawTransaction",
                vec![Value::String(quantity::format_bytes(raw))],
            )
            .await?;

        let hash = H256::from_hex(&result)?;
        tracing::info!("broadcast transaction {}", hash);
        Ok(hash)
    }

    // ==================== Call & Estimation ====================

    /// Execute a read-only call
    pub async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        self.request_bytes(
            "eth_call",
            vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
        )
        .await
    }

    /// Estimate gas for a transaction.
    ///
    /// A node verdict that the transaction cannot execute is reported as
    /// [`SdkError::Estimation`]; an unreachable or misbehaving node keeps its
    /// `Transport`/`Rpc` error.
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, SdkError> {
        let result = self
            .request_u64("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await;

        match result {
            Err(SdkError::Rpc { code, message }) if is_execution_failure(code, &message) => {
                tracing::warn!("gas estimation rejected: {}", message);
                Err(SdkError::Estimation(message))
            }
            other => other,
        }
    }
}

fn is_execution_failure(code: i64, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    code == EXECUTION_REVERTED_CODE
        || message.contains("revert")
        || message.contains("execution")
        || message.contains("insufficient funds")
        || message.contains("gas required exceeds")
        || message.contains("invalid opcode")
}
