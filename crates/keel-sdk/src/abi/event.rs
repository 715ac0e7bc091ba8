//! Event signatures and log decoding

use keel_primitives::H256;
use keel_types::Log;

use super::decode::decode;
use super::function::{types_of, Param};
use super::types::{ParamType, Token};
use crate::SdkError;

/// Contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name
    pub name: String,
    /// Parameters in declaration order
    pub inputs: Vec<Param>,
    /// Anonymous events carry no signature topic
    pub anonymous: bool,
}

impl Event {
    /// Create a non-anonymous event
    pub fn new(name: impl Into<String>, inputs: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            inputs,
            anonymous: false,
        }
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// Topic 0 of non-anonymous logs
    pub fn topic(&self) -> H256 {
        keel_crypto::keccak256(self.signature().as_bytes())
    }

    /// Decode a log into values in declaration order.
    ///
    /// Indexed value types come back as their value. Indexed strings, bytes,
    /// arrays and tuples are stored as hashes, so they come back as a 32-byte
    /// `FixedBytes` holding the topic.
    pub fn decode_log(&self, topics: &[H256], data: &[u8]) -> Result<Vec<Token>, SdkError> {
        let indexed_count = self.inputs.iter().filter(|p| p.indexed).count();
        let expected_topics = indexed_count + usize::from(!self.anonymous);
        if topics.len() != expected_topics {
            return Err(SdkError::Abi(format!(
                "{} expects {} topics, got {}",
                self.signature(),
                expected_topics,
                topics.len()
            )));
        }

        let mut topics = topics.iter();
        if !self.anonymous {
            let topic0 = topics.next();
            if topic0 != Some(&self.topic()) {
                return Err(SdkError::Abi(format!(
                    "log is not a {} event",
                    self.signature()
                )));
            }
        }

        let data_params: Vec<Param> = self.inputs.iter().filter(|p| !p.indexed).cloned().collect();
        let mut data_tokens = decode(&types_of(&data_params), data)?.into_iter();

        let mut result = Vec::with_capacity(self.inputs.len());
        for param in &self.inputs {
            let token = if param.indexed {
                let topic = topics
                    .next()
                    .ok_or_else(|| SdkError::Abi("missing topic".to_string()))?;
                decode_topic(&param.kind, topic)?
            } else {
                data_tokens
                    .next()
                    .ok_or_else(|| SdkError::Abi("missing data value".to_string()))?
            };
            result.push(token);
        }
        Ok(result)
    }

    /// Decode a receipt log
    pub fn parse_log(&self, log: &Log) -> Result<Vec<Token>, SdkError> {
        self.decode_log(&log.topics, &log.data)
    }
}

fn decode_topic(kind: &ParamType, topic: &H256) -> Result<Token, SdkError> {
    match kind {
        ParamType::Address
        | ParamType::Uint(_)
        | ParamType::Int(_)
        | ParamType::Bool
        | ParamType::FixedBytes(_) => {
            let mut tokens = decode(std::slice::from_ref(kind), topic.as_bytes())?;
            tokens
                .pop()
                .ok_or_else(|| SdkError::Abi("empty topic decode".to_string()))
        }
        _ => Ok(Token::FixedBytes(topic.as_bytes().to_vec())),
    }
}
