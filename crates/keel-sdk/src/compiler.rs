//! Contract compilation
//!
//! [`CompilerService`] turns Solidity sources into ABI and bytecode. The
//! deploy pipeline only sees this trait; [`SolcCompiler`] drives a local
//! `solc` binary and [`MockCompiler`] serves fixed artifacts in tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::abi::Abi;
use crate::config::CompilerConfig;
use crate::SdkError;

/// Source files by name
pub type Sources = BTreeMap<String, String>;

/// Interface and creation code of one contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDescriptor {
    /// Contract interface
    pub abi: Abi,
    /// Creation bytecode
    pub bytecode: Bytes,
}

/// Contracts produced by one compile call, by contract name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledArtifact {
    contracts: BTreeMap<String, ContractDescriptor>,
}

impl CompiledArtifact {
    /// Create an empty artifact
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract
    pub fn insert(&mut self, name: impl Into<String>, descriptor: ContractDescriptor) {
        self.contracts.insert(name.into(), descriptor);
    }

    /// Look up a contract by name
    pub fn get(&self, name: &str) -> Option<&ContractDescriptor> {
        self.contracts.get(name)
    }

    /// Remove and return a contract by name
    pub fn take(&mut self, name: &str) -> Option<ContractDescriptor> {
        self.contracts.remove(name)
    }

    /// Contract names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Number of contracts
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Whether nothing was produced
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Capability to compile sources with a given compiler version
#[async_trait]
pub trait CompilerService: Send + Sync {
    /// Compile `sources` with compiler `version`
    async fn compile(&self, version: &str, sources: &Sources) -> Result<CompiledArtifact, SdkError>;
}

// ==================== solc ====================

/// Compiler backed by a local `solc` binary, driven through `--standard-json`
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    path: PathBuf,
}

impl SolcCompiler {
    /// Use the binary at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use the binary named in configuration
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.solc_path.clone())
    }

    /// Version reported by `solc --version`, e.g. `0.8.19`
    pub async fn version(&self) -> Result<String, SdkError> {
        let output = Command::new(&self.path)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SdkError::Compile(format!("failed to run {}: {}", self.path.display(), e)))?;

        if !output.status.success() {
            return Err(SdkError::Compile(format!(
                "{} --version exited with {}",
                self.path.display(),
                output.status
            )));
        }

        parse_solc_version(&String::from_utf8_lossy(&output.stdout))
    }

    async fn run_standard_json(&self, input: &Value) -> Result<Value, SdkError> {
        let mut child = Command::new(&self.path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SdkError::Compile(format!("failed to run {}: {}", self.path.display(), e)))?;

        let payload = serde_json::to_vec(input)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| SdkError::Compile(format!("failed to write compiler input: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SdkError::Compile(format!("compiler did not finish: {}", e)))?;
        if !output.status.success() {
            return Err(SdkError::Compile(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| SdkError::Compile(format!("unreadable compiler output: {}", e)))
    }
}

#[async_trait]
impl CompilerService for SolcCompiler {
    async fn compile(&self, version: &str, sources: &Sources) -> Result<CompiledArtifact, SdkError> {
        let installed = self.version().await?;
        if installed != version.trim_start_matches('v') {
            return Err(SdkError::Compile(format!(
                "requested solc {}, found {}",
                version, installed
            )));
        }

        tracing::debug!("compiling {} source files with solc {}", sources.len(), installed);
        let output = self.run_standard_json(&standard_json_input(sources)).await?;
        parse_standard_json_output(&output)
    }
}

fn standard_json_input(sources: &Sources) -> Value {
    let sources: serde_json::Map<String, Value> = sources
        .iter()
        .map(|(name, content)| (name.clone(), json!({ "content": content })))
        .collect();

    json!({
        "language": "Solidity",
        "sources": sources,
        "settings": {
            "outputSelection": {
                "*": { "*": ["abi", "evm.bytecode.object"] }
            }
        }
    })
}

fn parse_solc_version(output: &str) -> Result<String, SdkError> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Version:"))
        .map(|v| v.trim().split(['+', '-']).next().unwrap_or_default().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SdkError::Compile(format!("unrecognized solc version output: {}", output.trim())))
}

fn parse_standard_json_output(output: &Value) -> Result<CompiledArtifact, SdkError> {
    let errors: Vec<&str> = output["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter(|e| e["severity"] == "error")
                .map(|e| {
                    e["formattedMessage"]
                        .as_str()
                        .or_else(|| e["message"].as_str())
                        .unwrap_or("unknown error")
                })
                .collect()
        })
        .unwrap_or_default();
    if !errors.is_empty() {
        return Err(SdkError::Compile(errors.join("\n")));
    }

    let mut artifact = CompiledArtifact::new();
    let files = output["contracts"].as_object().into_iter().flatten();
    for (file, contracts) in files {
        let Some(contracts) = contracts.as_object() else {
            continue;
        };
        for (name, contract) in contracts {
            if artifact.get(name).is_some() {
                return Err(SdkError::Compile(format!(
                    "contract name {} is defined more than once (again in {})",
                    name, file
                )));
            }
            let abi = Abi::from_value(contract["abi"].clone())
                .map_err(|e| SdkError::Compile(format!("{}: {}", name, e)))?;
            let object = contract["evm"]["bytecode"]["object"].as_str().unwrap_or_default();
            let bytecode = hex::decode(object.trim_start_matches("0x"))
                .map_err(|e| SdkError::Compile(format!("{}: invalid bytecode: {}", name, e)))?;
            artifact.insert(
                name.clone(),
                ContractDescriptor {
                    abi,
                    bytecode: Bytes::from(bytecode),
                },
            );
        }
    }
    Ok(artifact)
}

// ==================== Mock ====================

/// Compiler returning a fixed artifact, for tests
#[derive(Debug, Clone, Default)]
pub struct MockCompiler {
    artifact: CompiledArtifact,
    error: Option<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockCompiler {
    /// Create a compiler that produces no contracts
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce `descriptor` under `name`
    pub fn with_contract(mut self, name: impl Into<String>, descriptor: ContractDescriptor) -> Self {
        self.artifact.insert(name, descriptor);
        self
    }

    /// Fail every compile with `message`
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of compile calls, shared between clones
    pub fn compile_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompilerService for MockCompiler {
    async fn compile(&self, _version: &str, _sources: &Sources) -> Result<CompiledArtifact, SdkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(message) => Err(SdkError::Compile(message.clone())),
            None => Ok(self.artifact.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_solc_version() {
        let output = "solc, the solidity compiler commandline interface\nVersion: 0.8.19+commit.7dd6d404.Linux.g++\n";
        assert_eq!(parse_solc_version(output).unwrap(), "0.8.19");
        assert!(parse_solc_version("garbage").is_err());
    }

    #[test]
    fn test_standard_json_input() {
        let mut sources = Sources::new();
        sources.insert("Totem.sol".into(), "contract Totem {}".into());
        let input = standard_json_input(&sources);
        assert_eq!(input["language"], "Solidity");
        assert_eq!(input["sources"]["Totem.sol"]["content"], "contract Totem {}");
    }

    #[test]
    fn test_parse_output() {
        let output = json!({
            "contracts": {
                "Store.sol": {
                    "Store": {
                        "abi": [{"type":"function","name":"get","inputs":[],"outputs":[{"type":"uint256"}],"stateMutability":"view"}],
                        "evm": {"bytecode": {"object": "6080604052"}}
                    }
                }
            },
            "errors": [{"severity": "warning", "formattedMessage": "unused variable"}]
        });
        let artifact = parse_standard_json_output(&output).unwrap();
        let store = artifact.get("Store").unwrap();
        assert_eq!(store.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert!(store.abi.function("get").is_ok());
    }

    #[test]
    fn test_parse_output_errors() {
        let output = json!({
            "errors": [{"severity": "error", "formattedMessage": "ParserError: expected ';'"}]
        });
        match parse_standard_json_output(&output) {
            Err(SdkError::Compile(msg)) => assert!(msg.contains("ParserError")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_compiler() {
        let compiler = MockCompiler::new().with_contract(
            "Store",
            ContractDescriptor {
                abi: Abi::default(),
                bytecode: Bytes::from_static(&[0x60]),
            },
        );
        let handle = compiler.clone();

        let artifact = compiler.compile("0.8.19", &Sources::new()).await.unwrap();
        assert_eq!(artifact.names().collect::<Vec<_>>(), vec!["Store"]);
        assert_eq!(handle.compile_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_solc_binary() {
        let compiler = SolcCompiler::new("/nonexistent/solc-binary");
        let result = compiler.compile("0.8.19", &Sources::new()).await;
        assert!(matches!(result, Err(SdkError::Compile(_))));
    }
}
