//! SDK request and polling types

use std::time::Duration;

use bytes::Bytes;
use keel_primitives::{Address, H256, U256};
use keel_types::quantity;
use keel_types::SignedTransaction;
use serde::Serialize;

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(u64),
    /// Latest block
    #[default]
    Latest,
    /// Pending block (includes pending transactions)
    Pending,
    /// Earliest block (genesis)
    Earliest,
    /// Safe block
    Safe,
    /// Finalized block
    Finalized,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&quantity::format_u64(*n)),
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Earliest => serializer.serialize_str("earliest"),
            BlockId::Safe => serializer.serialize_str("safe"),
            BlockId::Finalized => serializer.serialize_str("finalized"),
        }
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        BlockId::Number(n)
    }
}

/// Call request for eth_call and eth_estimateGas
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address, `None` for contract creation
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<U256>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Input data
    pub data: Option<Bytes>,
}

impl Serialize for CallRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let count = [
            self.from.is_some(),
            self.to.is_some(),
            self.gas.is_some(),
            self.gas_price.is_some(),
            self.value.is_some(),
            self.data.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        let mut map = serializer.serialize_map(Some(count))?;

        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(gas) = &self.gas {
            map.serialize_entry("gas", &quantity::format_u64(*gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &quantity::format_u256(gas_price))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &quantity::format_u256(value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &quantity::format_bytes(data))?;
        }

        map.end()
    }
}

/// Receipt polling bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between polls
    pub interval: Duration,
    /// Total time before giving up
    pub timeout: Duration,
}

impl PollConfig {
    /// Create a poll config
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// A transaction accepted by the node, not yet mined
#[derive(Debug, Clone)]
pub struct SentTransaction {
    /// Hash reported by the node
    pub hash: H256,
    /// The signed payload that was broadcast
    pub signed: SignedTransaction,
}
