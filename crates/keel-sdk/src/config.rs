//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::PollConfig;
use crate::SdkError;

/// Client configuration, usually read from a TOML file
///
/// ```toml
/// rpc_url = "http://localhost:8545"
/// chain_id = 1337
/// request_timeout_secs = 30
///
/// [receipt]
/// poll_interval_ms = 1000
/// timeout_secs = 120
///
/// [compiler]
/// solc_path = "solc"
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Chain ID; fetched from the node when absent
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Receipt polling
    #[serde(default)]
    pub receipt: ReceiptConfig,
    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Receipt polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Delay between receipt polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up after this long
    #[serde(default = "default_receipt_timeout_secs")]
    pub timeout_secs: u64,
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Path to the `solc` binary
    #[serde(default = "default_solc_path")]
    pub solc_path: PathBuf,
    /// Compile timeout
    #[serde(default = "default_compile_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_solc_path() -> PathBuf {
    PathBuf::from("solc")
}

fn default_compile_timeout_secs() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            receipt: ReceiptConfig::default(),
            compiler: CompilerConfig::default(),
        }
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            solc_path: default_solc_path(),
            timeout_secs: default_compile_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Parse from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, SdkError> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| SdkError::Serialization(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SdkError::Validation(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, SdkError> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Serialization(e.to_string()))
    }

    fn validate(&self) -> Result<(), SdkError> {
        if self.rpc_url.trim().is_empty() {
            return Err(SdkError::Validation("rpc_url must not be empty".to_string()));
        }
        if self.chain_id == Some(0) {
            return Err(SdkError::Validation("chain_id must not be 0".to_string()));
        }
        if self.request_timeout_secs == 0 || self.receipt.timeout_secs == 0 {
            return Err(SdkError::Validation("timeouts must be positive".to_string()));
        }
        if self.receipt.poll_interval_ms == 0 {
            return Err(SdkError::Validation(
                "receipt.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Receipt polling bounds
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_millis(self.receipt.poll_interval_ms),
            Duration::from_secs(self.receipt.timeout_secs),
        )
    }

    /// Compile timeout
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.timeout_secs)
    }
}
