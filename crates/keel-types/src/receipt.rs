//! Transaction receipts as returned by `eth_getTransactionReceipt`

use bytes::Bytes;
use keel_primitives::{Address, H256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::quantity;

/// Transaction execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Transaction reverted
    Failure = 0,
    /// Transaction succeeded
    Success = 1,
}

impl From<bool> for TxStatus {
    fn from(success: bool) -> Self {
        if success {
            TxStatus::Success
        } else {
            TxStatus::Failure
        }
    }
}

impl Serialize for TxStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&quantity::format_u64(*self as u64))
    }
}

impl<'de> Deserialize<'de> for TxStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match quantity::parse_u64(&s).map_err(de::Error::custom)? {
            0 => Ok(TxStatus::Failure),
            1 => Ok(TxStatus::Success),
            other => Err(de::Error::custom(format!("invalid status: {}", other))),
        }
    }
}

/// Log entry emitted during execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics, topic 0 is the event signature for non-anonymous events
    pub topics: Vec<H256>,
    /// Non-indexed data
    #[serde(with = "quantity::bytes_hex")]
    pub data: Bytes,
    /// Block containing the log
    #[serde(default, with = "quantity::opt_u64_hex")]
    pub block_number: Option<u64>,
    /// Transaction that emitted the log
    #[serde(default)]
    pub transaction_hash: Option<H256>,
    /// Index within the block
    #[serde(default, with = "quantity::opt_u64_hex")]
    pub log_index: Option<u64>,
    /// Removed by a reorg
    #[serde(default)]
    pub removed: bool,
}

impl Log {
    /// First topic, usually the event signature
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }
}

/// Transaction receipt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: H256,
    /// Index within the block
    #[serde(with = "quantity::u64_hex")]
    pub transaction_index: u64,
    /// Block hash
    pub block_hash: Option<H256>,
    /// Block number
    #[serde(default, with = "quantity::opt_u64_hex")]
    pub block_number: Option<u64>,
    /// Sender
    pub from: Address,
    /// Recipient, `None` for contract creation
    #[serde(default)]
    pub to: Option<Address>,
    /// Gas used in the block up to and including this transaction
    #[serde(with = "quantity::u64_hex")]
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction
    #[serde(with = "quantity::u64_hex")]
    pub gas_used: u64,
    /// Created contract, if any
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Emitted logs
    #[serde(default)]
    pub logs: Vec<Log>,
    /// Execution status; absent on pre-Byzantium receipts
    #[serde(default)]
    pub status: Option<TxStatus>,
}

impl TransactionReceipt {
    /// True when the node reports a revert
    pub fn is_reverted(&self) -> bool {
        self.status == Some(TxStatus::Failure)
    }
}
