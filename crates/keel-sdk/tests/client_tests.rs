//! Client integration tests for keel-sdk
//!
//! Tests client creation, RPC method wrappers and receipt polling.

use std::time::Duration;

use keel_sdk::types::{BlockId, CallRequest, PollConfig};
use keel_sdk::{Address, CancellationToken, ChainClient, MockTransport, SdkError, H256, U256};
use serde_json::{json, Value};

fn tx_hash() -> H256 {
    H256::from_hex("0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b").unwrap()
}

fn receipt_json() -> Value {
    json!({
        "transactionHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
        "transactionIndex": "0x0",
        "blockHash": "0x0000000000000000000000000000000000000000000000000000000000000abc",
        "blockNumber": "0x10",
        "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        "to": "0x742d35cc6634c0532925a3b844bc9e7595f0ab3d",
        "cumulativeGasUsed": "0x5208",
        "gasUsed": "0x5208",
        "contractAddress": null,
        "logs": [],
        "status": "0x1"
    })
}

fn fast_poll() -> PollConfig {
    PollConfig::new(Duration::from_millis(5), Duration::from_millis(200))
}

// ==================== Client Creation Tests ====================

/// Test that a custom chain id reported by the node is used
#[tokio::test]
async fn test_client_with_custom_chain_id() {
    let transport = MockTransport::new();
    transport.set_response("eth_chainId", Value::String("0x5".to_string()));
    let client = ChainClient::with_transport(transport);

    assert_eq!(client.chain_id().await.unwrap(), 5);
}

/// Test that a pinned chain id never asks the node
#[tokio::test]
async fn test_client_pinned_chain_id() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone()).with_chain_id(1337);

    assert_eq!(client.chain_id().await.unwrap(), 1337);
    assert_eq!(transport.call_count("eth_chainId"), 0);
}

// ==================== Chain Info Tests ====================

/// Test block number and gas price defaults
#[tokio::test]
async fn test_chain_info() {
    let client = ChainClient::new_mock();
    assert_eq!(client.block_number().await.unwrap(), 256);
    assert_eq!(client.gas_price().await.unwrap(), U256::from(1_000_000_000u64));
}

/// Test that a block number beyond u64 is rejected rather than truncated
#[tokio::test]
async fn test_block_number_overflow_rejected() {
    let transport = MockTransport::new();
    transport.set_response("eth_blockNumber", json!("0x10000000000000000"));
    let client = ChainClient::with_transport(transport);

    assert!(matches!(
        client.block_number().await,
        Err(SdkError::Serialization(_))
    ));
}

// ==================== Account Query Tests ====================

/// Test that the balance is reported exactly in ether
#[tokio::test]
async fn test_get_balance_in_ether() {
    let transport = MockTransport::new();
    transport.set_response("eth_getBalance", json!("0x470de4df820000")); // 0.02 ether
    let client = ChainClient::with_transport(transport.clone());

    let balance = client
        .get_balance_in_ether(&Address::ZERO, BlockId::Latest)
        .await
        .unwrap();
    assert_eq!(balance.to_string(), "0.02");
    assert_eq!(balance.raw(), U256::from(20_000_000_000_000_000u64));

    let params = &transport.params_of("eth_getBalance")[0];
    assert_eq!(params[0], json!("0x0000000000000000000000000000000000000000"));
    assert_eq!(params[1], json!("latest"));
}

/// Test that nonce lookups pass the requested block tag
#[tokio::test]
async fn test_get_nonce_block_tag() {
    let transport = MockTransport::new();
    transport.set_response("eth_getTransactionCount", json!("0x2a"));
    let client = ChainClient::with_transport(transport.clone());

    let nonce = client
        .get_nonce(&Address::ZERO, BlockId::Number(100))
        .await
        .unwrap();
    assert_eq!(nonce, 42);
    assert_eq!(transport.params_of("eth_getTransactionCount")[0][1], json!("0x64"));
}

/// Test code lookups decode the returned data
#[tokio::test]
async fn test_get_code() {
    let transport = MockTransport::new();
    transport.set_response("eth_getCode", json!("0x6080"));
    let client = ChainClient::with_transport(transport);

    let code = client.get_code(&Address::ZERO, BlockId::Latest).await.unwrap();
    assert_eq!(code.as_ref(), &[0x60, 0x80]);
}

// ==================== Block & Transaction Queries ====================

/// Test that unknown blocks and transactions come back as None
#[tokio::test]
async fn test_missing_objects_are_none() {
    let client = ChainClient::new_mock();
    assert!(client.get_block(BlockId::Latest).await.unwrap().is_none());
    assert!(client.get_block_by_hash(&H256::ZERO).await.unwrap().is_none());
    assert!(client.get_transaction(&tx_hash()).await.unwrap().is_none());
    assert!(client
        .get_transaction_from_block(BlockId::Number(1), 0)
        .await
        .unwrap()
        .is_none());
    assert!(client.get_receipt(&tx_hash()).await.unwrap().is_none());
}

/// Test decoding of a block with full transactions
#[tokio::test]
async fn test_get_block_with_transactions() {
    let transport = MockTransport::new();
    transport.set_response(
        "eth_getBlockByNumber",
        json!({
            "number": "0x10",
            "hash": "0x0000000000000000000000000000000000000000000000000000000000000abc",
            "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000abb",
            "timestamp": "0x64",
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x5208",
            "miner": "0x0000000000000000000000000000000000000000",
            "transactions": [{
                "hash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
                "nonce": "0x0",
                "blockHash": "0x0000000000000000000000000000000000000000000000000000000000000abc",
                "blockNumber": "0x10",
                "transactionIndex": "0x0",
                "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
                "to": "0x742d35cc6634c0532925a3b844bc9e7595f0ab3d",
                "value": "0x470de4df820000",
                "gasPrice": "0x3b9aca00",
                "gas": "0x5208",
                "input": "0x"
            }]
        }),
    );
    let client = ChainClient::with_transport(transport.clone());

    let block = client.get_block(BlockId::Number(16)).await.unwrap().unwrap();
    assert_eq!(block.number, Some(16));
    assert_eq!(block.transactions.len(), 1);
    assert_eq!(block.transactions.hashes(), vec![tx_hash()]);
    assert_eq!(transport.params_of("eth_getBlockByNumber")[0][1], json!(true));
}

/// Test transaction counts and the pending pool
#[tokio::test]
async fn test_block_transaction_count_and_pending() {
    let transport = MockTransport::new();
    transport.set_response("eth_getBlockTransactionCountByNumber", json!("0x3"));
    let client = ChainClient::with_transport(transport);

    assert_eq!(
        client.get_block_transaction_count(BlockId::Latest).await.unwrap(),
        3
    );
    assert!(client.get_pending_transactions().await.unwrap().is_empty());
}

/// Test that a null pending pool reads as empty
#[tokio::test]
async fn test_pending_transactions_null() {
    let transport = MockTransport::new();
    transport.set_response("eth_pendingTransactions", Value::Null);
    let client = ChainClient::with_transport(transport);

    assert!(client.get_pending_transactions().await.unwrap().is_empty());
}

// ==================== Call & Broadcast ====================

/// Test eth_call request shape and result decoding
#[tokio::test]
async fn test_call() {
    let transport = MockTransport::new();
    transport.set_response("eth_call", json!("0x01"));
    let client = ChainClient::with_transport(transport.clone());

    let request = CallRequest {
        to: Some(Address::ZERO),
        data: Some(vec![0xaa].into()),
        ..Default::default()
    };
    let result = client.call(&request, BlockId::Pending).await.unwrap();
    assert_eq!(result.as_ref(), &[0x01]);

    let params = &transport.params_of("eth_call")[0];
    assert_eq!(params[0]["data"], json!("0xaa"));
    assert_eq!(params[1], json!("pending"));
}

/// Test that broadcast returns the node's hash and sends the raw payload
#[tokio::test]
async fn test_send_raw_transaction() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone());

    let hash = client.send_raw_transaction(&[0xf8, 0x6c]).await.unwrap();
    assert_eq!(hash, tx_hash());
    assert_eq!(transport.params_of("eth_sendRawTransaction")[0][0], json!("0xf86c"));
}

/// Test that node errors keep their code and message verbatim
#[tokio::test]
async fn test_rpc_error_verbatim() {
    let transport = MockTransport::new();
    transport.set_rpc_error("eth_sendRawTransaction", -32000, "nonce too low");
    let client = ChainClient::with_transport(transport);

    match client.send_raw_transaction(&[0x00]).await {
        Err(SdkError::Rpc { code, message }) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "nonce too low");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

// ==================== Receipt Polling ====================

/// Test that polling returns once the receipt appears
#[tokio::test]
async fn test_wait_for_receipt_found_after_polls() {
    let transport = MockTransport::new();
    transport.push_response("eth_getTransactionReceipt", Value::Null);
    transport.push_response("eth_getTransactionReceipt", Value::Null);
    transport.push_response("eth_getTransactionReceipt", receipt_json());
    let client = ChainClient::with_transport(transport.clone());

    let receipt = client
        .wait_for_receipt(&tx_hash(), &fast_poll(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(receipt.gas_used, 21000);
    assert!(!receipt.is_reverted());
    assert_eq!(transport.call_count("eth_getTransactionReceipt"), 3);
}

/// Test that polling gives up after the timeout
#[tokio::test]
async fn test_wait_for_receipt_timeout() {
    let client = ChainClient::new_mock();
    let poll = PollConfig::new(Duration::from_millis(5), Duration::from_millis(30));

    let result = client
        .wait_for_receipt(&tx_hash(), &poll, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SdkError::Timeout(_))));
}

/// Test that cancellation stops the wait early
#[tokio::test]
async fn test_wait_for_receipt_cancelled() {
    let client = ChainClient::new_mock();
    let poll = PollConfig::new(Duration::from_millis(10), Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let result = client.wait_for_receipt(&tx_hash(), &poll, &cancel).await;
    assert!(matches!(result, Err(SdkError::Cancelled(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Test that an RPC failure while polling ends the wait
#[tokio::test]
async fn test_wait_for_receipt_rpc_error() {
    let transport = MockTransport::new();
    transport.set_transport_error("eth_getTransactionReceipt", "connection reset");
    let client = ChainClient::with_transport(transport);

    let result = client
        .wait_for_receipt(&tx_hash(), &fast_poll(), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SdkError::Transport(_))));
}
