//! SDK error types

use keel_crypto::CryptoError;
use keel_primitives::{AddressError, HashError};
use keel_types::TxCodecError;
use thiserror::Error;

/// SDK error type
///
/// Every pipeline step fails closed with one of these; nothing is retried.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Caller input rejected before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// Endpoint unreachable or the response could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// Error object returned by the node, message verbatim
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// The node rejected the transaction during gas estimation
    #[error("gas estimation failed: {0}")]
    Estimation(String),

    /// ABI encoding, decoding or lookup failed
    #[error("abi error: {0}")]
    Abi(String),

    /// Compilation failed, timed out, or the requested contract is missing
    #[error("compile error: {0}")]
    Compile(String),

    /// The deployment receipt carries no usable contract
    #[error("deployment error: {0}")]
    Deployment(String),

    /// Signing failed
    #[error("signing error: {0}")]
    Signing(String),

    /// A bounded wait elapsed
    #[error("timed out: {0}")]
    Timeout(String),

    /// A wait was cancelled by the caller
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Malformed data from the node or a config file
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SdkError {
    /// True for failures of the endpoint or the node itself
    pub fn is_rpc(&self) -> bool {
        matches!(self, SdkError::Transport(_) | SdkError::Rpc { .. })
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<CryptoError> for SdkError {
    fn from(e: CryptoError) -> Self {
        SdkError::Signing(e.to_string())
    }
}

impl From<TxCodecError> for SdkError {
    fn from(e: TxCodecError) -> Self {
        match e {
            TxCodecError::InvalidChainId(_) | TxCodecError::Crypto(_) => {
                SdkError::Signing(e.to_string())
            }
            _ => SdkError::Serialization(e.to_string()),
        }
    }
}

impl From<AddressError> for SdkError {
    fn from(e: AddressError) -> Self {
        SdkError::Validation(e.to_string())
    }
}

impl From<HashError> for SdkError {
    fn from(e: HashError) -> Self {
        SdkError::Serialization(e.to_string())
    }
}
