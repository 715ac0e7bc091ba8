//! Transport layer for JSON-RPC communication

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::SdkError;

/// Capability to execute one JSON-RPC request against a node (object-safe)
///
/// Implementations must not retry: a failed request is reported once.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Send an RPC request and get the `result` member of the response
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError>;
}

#[async_trait]
impl<T: ChainTransport + ?Sized> ChainTransport for Arc<T> {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        (**self).request_json(method, params).await
    }
}

/// Helper to deserialize response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

/// One request observed by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// RPC method
    pub method: String,
    /// Positional parameters
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum MockReply {
    Result(Value),
    Rpc { code: i64, message: String },
    Transport(String),
}

impl MockReply {
    fn into_result(self) -> Result<Value, SdkError> {
        match self {
            MockReply::Result(v) => Ok(v),
            MockReply::Rpc { code, message } => Err(SdkError::Rpc { code, message }),
            MockReply::Transport(msg) => Err(SdkError::Transport(msg)),
        }
    }
}

#[derive(Default)]
struct MockState {
    queued: HashMap<String, VecDeque<MockReply>>,
    fixed: HashMap<String, MockReply>,
    defaults: HashMap<String, Value>,
    calls: Vec<RecordedCall>,
    latency: Option<Duration>,
}

/// In-memory transport for tests.
///
/// Replies are taken, in order, from the per-method queue, then the fixed
/// response or injected error, then the defaults. Every request is recorded.
/// Clones share state, so a test can keep one handle for inspection after
/// handing another to a client.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        let mut defaults = HashMap::new();

        defaults.insert("eth_chainId".to_string(), Value::String("0x1".to_string()));
        defaults.insert("eth_gasPrice".to_string(), Value::String("0x3b9aca00".to_string())); // 1 gwei
        defaults.insert("eth_blockNumber".to_string(), Value::String("0x100".to_string())); // Block 256
        defaults.insert("eth_getBalance".to_string(), Value::String("0xde0b6b3a7640000".to_string())); // 1 ETH
        defaults.insert("eth_getTransactionCount".to_string(), Value::String("0x0".to_string()));
        defaults.insert("eth_estimateGas".to_string(), Value::String("0x5208".to_string())); // 21000
        defaults.insert("eth_sendRawTransaction".to_string(), Value::String(
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string()
        ));
        defaults.insert("eth_call".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getCode".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getBlockTransactionCountByNumber".to_string(), Value::String("0x0".to_string()));
        defaults.insert("eth_getBlockByNumber".to_string(), Value::Null);
        defaults.insert("eth_getBlockByHash".to_string(), Value::Null);
        defaults.insert("eth_getTransactionByHash".to_string(), Value::Null);
        defaults.insert("eth_getTransactionByBlockNumberAndIndex".to_string(), Value::Null);
        defaults.insert("eth_getTransactionReceipt".to_string(), Value::Null);
        defaults.insert("eth_pendingTransactions".to_string(), Value::Array(vec![]));

        Self {
            state: Arc::new(Mutex::new(MockState {
                defaults,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the calls recorded before it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Delay every reply, so concurrent callers interleave
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = Some(latency);
        self
    }

    /// Set a fixed response for a method
    pub fn set_response(&self, method: &str, response: Value) {
        self.state()
            .fixed
            .insert(method.to_string(), MockReply::Result(response));
    }

    /// Make every call to `method` fail with a node error
    pub fn set_rpc_error(&self, method: &str, code: i64, message: &str) {
        self.state().fixed.insert(
            method.to_string(),
            MockReply::Rpc {
                code,
                message: message.to_string(),
            },
        );
    }

    /// Make every call to `method` fail at the transport level
    pub fn set_transport_error(&self, method: &str, message: &str) {
        self.state()
            .fixed
            .insert(method.to_string(), MockReply::Transport(message.to_string()));
    }

    /// Queue a one-shot response for a method
    pub fn push_response(&self, method: &str, response: Value) {
        self.state()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(MockReply::Result(response));
    }

    /// Queue a one-shot node error for a method
    pub fn push_rpc_error(&self, method: &str, code: i64, message: &str) {
        self.state()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(MockReply::Rpc {
                code,
                message: message.to_string(),
            });
    }

    /// Clear fixed and queued responses; defaults stay
    pub fn clear_responses(&self) {
        let mut state = self.state();
        state.fixed.clear();
        state.queued.clear();
    }

    /// All requests seen so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of requests seen for a method
    pub fn call_count(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|c| c.method == method).count()
    }

    /// Parameters of every request seen for a method
    pub fn params_of(&self, method: &str) -> Vec<Vec<Value>> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .map(|c| c.params.clone())
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainTransport for MockTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let (reply, latency) = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                method: method.to_string(),
                params,
            });

            let queued = state.queued.get_mut(method).and_then(|q| q.pop_front());
            let reply = queued
                .or_else(|| state.fixed.get(method).cloned())
                .or_else(|| state.defaults.get(method).cloned().map(MockReply::Result))
                .unwrap_or_else(|| MockReply::Rpc {
                    code: -32601,
                    message: format!("Method not found: {}", method),
                });
            (reply, state.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        reply.into_result()
    }
}

/// HTTP transport for a single node endpoint
///
/// One request per call, bounded by the configured timeout. No pooling
/// beyond what `reqwest` does internally, and no retries.
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a transport with a per-request timeout
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SdkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl ChainTransport for HttpTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SdkError::Timeout(format!("{} after request timeout", method))
                } else {
                    SdkError::Transport(e.to_string())
                }
            })?;

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        parse_envelope(response)
    }
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

// `result: null` is a valid answer (e.g. an unknown receipt), so only a
// missing member together with a missing error is malformed.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
fn parse_envelope(response: JsonRpcResponse) -> Result<Value, SdkError> {
    if let Some(error) = response.error {
        return Err(SdkError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}
