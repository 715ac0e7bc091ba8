//! Blocks and transactions as returned by the node

use bytes::Bytes;
use keel_primitives::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::quantity;

/// Transaction as returned by `eth_getTransactionByHash` and friends
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    /// Transaction hash
    pub hash: H256,
    /// Sender nonce
    #[serde(with = "quantity::u64_hex")]
    pub nonce: u64,
    /// Containing block, `None` while pending
    #[serde(default)]
    pub block_hash: Option<H256>,
    /// Containing block number, `None` while pending
    #[serde(default, with = "quantity::opt_u64_hex")]
    pub block_number: Option<u64>,
    /// Index within the block, `None` while pending
    #[serde(default, with = "quantity::opt_u64_hex")]
    pub transaction_index: Option<u64>,
    /// Sender
    pub from: Address,
    /// Recipient, `None` for contract creation
    #[serde(default)]
    pub to: Option<Address>,
    /// Value in wei
    #[serde(with = "quantity::u256_hex")]
    pub value: U256,
    /// Gas price in wei
    #[serde(default, with = "quantity::opt_u256_hex")]
    pub gas_price: Option<U256>,
    /// Gas limit
    #[serde(with = "quantity::u64_hex")]
    pub gas: u64,
    /// Call data
    #[serde(with = "quantity::bytes_hex")]
    pub input: Bytes,
}

/// Block transactions, either hashes or full objects depending on the request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    /// Hashes only
    Hashes(Vec<H256>),
    /// Full transaction objects
    Full(Vec<TransactionView>),
}

impl BlockTransactions {
    /// Number of transactions
    pub fn len(&self) -> usize {
        match self {
            BlockTransactions::Hashes(h) => h.len(),
            BlockTransactions::Full(t) => t.len(),
        }
    }

    /// True if the block carries no transactions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transaction hashes in block order
    pub fn hashes(&self) -> Vec<H256> {
        match self {
            BlockTransactions::Hashes(h) => h.clone(),
            BlockTransactions::Full(t) => t.iter().map(|tx| tx.hash).collect(),
        }
    }
}

impl Default for BlockTransactions {
    fn default() -> Self {
        BlockTransactions::Hashes(Vec::new())
    }
}

/// Block as returned by `eth_getBlockByNumber` / `eth_getBlockByHash`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    /// Block number, `None` for a pending block
    #[serde(default, with = "quantity::opt_u64_hex")]
    pub number: Option<u64>,
    /// Block hash, `None` for a pending block
    #[serde(default)]
    pub hash: Option<H256>,
    /// Parent hash
    pub parent_hash: H256,
    /// Unix timestamp
    #[serde(with = "quantity::u64_hex")]
    pub timestamp: u64,
    /// Gas limit
    #[serde(with = "quantity::u64_hex")]
    pub gas_limit: u64,
    /// Gas used
    #[serde(with = "quantity::u64_hex")]
    pub gas_used: u64,
    /// Beneficiary
    #[serde(default)]
    pub miner: Option<Address>,
    /// Base fee, absent before London
    #[serde(default, with = "quantity::opt_u256_hex")]
    pub base_fee_per_gas: Option<U256>,
    /// Transactions
    #[serde(default)]
    pub transactions: BlockTransactions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_json() -> serde_json::Value {
        serde_json::json!({
            "hash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            "nonce": "0x2",
            "blockHash": null,
            "blockNumber": null,
            "transactionIndex": null,
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "value": "0x470de4df820000",
            "gasPrice": "0x3b9aca00",
            "gas": "0x5208",
            "input": "0x"
        })
    }

    #[test]
    fn test_pending_transaction_view() {
        let tx: TransactionView = serde_json::from_value(tx_json()).unwrap();
        assert_eq!(tx.nonce, 2);
        assert!(tx.block_number.is_none());
        assert_eq!(tx.value, U256::from(20_000_000_000_000_000u64));
        assert_eq!(tx.gas_price, Some(U256::from(1_000_000_000u64)));
        assert!(tx.input.is_empty());
    }

    #[test]
    fn test_block_with_hashes() {
        let block: BlockView = serde_json::from_value(serde_json::json!({
            "number": "0x100",
            "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "timestamp": "0x6553f100",
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x0",
            "miner": "0x0000000000000000000000000000000000000000",
            "transactions": [
                "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"
            ]
        }))
        .unwrap();

        assert_eq!(block.number, Some(256));
        assert_eq!(block.transactions.len(), 1);
        assert!(matches!(block.transactions, BlockTransactions::Hashes(_)));
        assert!(block.base_fee_per_gas.is_none());
    }

    #[test]
    fn test_block_with_full_transactions() {
        let block: BlockView = serde_json::from_value(serde_json::json!({
            "number": "0x1",
            "hash": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "timestamp": "0x0",
            "gasLimit": "0x0",
            "gasUsed": "0x0",
            "baseFeePerGas": "0x7",
            "transactions": [tx_json()]
        }))
        .unwrap();

        assert!(matches!(block.transactions, BlockTransactions::Full(_)));
        assert_eq!(block.transactions.hashes().len(), 1);
        assert_eq!(block.base_fee_per_gas, Some(U256::from(7u64)));
    }
}
