//! Contract integration tests
//!
//! ERC-20 reads and writes through the typed contract handle.

use keel_sdk::abi::{encode, Abi, ParamType, Token};
use keel_sdk::types::BlockId;
use keel_sdk::{
    token_balance, Address, ChainClient, Contract, MockTransport, PrivateKey, SdkError, TxBuilder,
    U256,
};
use serde_json::json;

const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn token() -> Address {
    Address::from_bytes([0xa0; 20])
}

fn owner() -> Address {
    Address::from_bytes([0x42; 20])
}

fn word(value: u64) -> serde_json::Value {
    let encoded = encode(&[ParamType::Uint(256)], &[Token::Uint(U256::from(value))]).unwrap();
    json!(format!("0x{}", hex::encode(encoded)))
}

// ==================== Reads ====================

/// Test that the token balance is scaled by the token's decimals
#[tokio::test]
async fn test_token_balance_uses_decimals() {
    let transport = MockTransport::new();
    // balanceOf is issued before decimals
    transport.push_response("eth_call", word(5_000_000));
    transport.push_response("eth_call", word(6));
    let client = ChainClient::with_transport(transport.clone());

    let balance = token_balance(&client, &Contract::erc20(token()), &owner()).await.unwrap();
    assert_eq!(balance.raw(), U256::from(5_000_000u64));
    assert_eq!(balance.to_string(), "5.0");

    let calls = transport.params_of("eth_call");
    assert_eq!(calls.len(), 2);
    let balance_of = calls[0][0]["data"].as_str().unwrap();
    assert!(balance_of.starts_with("0x70a08231"));
    assert!(balance_of.ends_with(&hex::encode(owner().as_bytes())));
    assert_eq!(calls[1][0]["data"], json!("0x313ce567"));
    assert_eq!(calls[0][0]["to"], json!(token().to_hex()));
}

/// Test that an out-of-range decimals value is rejected
#[tokio::test]
async fn test_token_balance_bad_decimals() {
    let transport = MockTransport::new();
    transport.push_response("eth_call", word(1));
    transport.push_response("eth_call", word(300));
    let client = ChainClient::with_transport(transport);

    let result = token_balance(&client, &Contract::erc20(token()), &owner()).await;
    assert!(matches!(result, Err(SdkError::Abi(_))));
}

/// Test the composed read against a non-ERC-20 interface
#[tokio::test]
async fn test_scaled_read_custom_interface() {
    let vault_abi = Abi::from_json(
        r#"[
            {"type":"function","name":"sharesOf","inputs":[{"name":"who","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
            {"type":"function","name":"shareDecimals","inputs":[],"outputs":[{"name":"","type":"uint8"}],"stateMutability":"view"}
        ]"#,
    )
    .unwrap();
    let vault = Contract::new(token(), vault_abi);

    let transport = MockTransport::new();
    transport.push_response("eth_call", word(1_250));
    transport.push_response("eth_call", word(3));
    let client = ChainClient::with_transport(transport.clone());

    let shares = vault
        .scaled_read(&client, "sharesOf", &[Token::Address(owner())], "shareDecimals")
        .await
        .unwrap();
    assert_eq!(shares.to_string(), "1.25");

    let selector = hex::encode(&vault.function("sharesOf").unwrap().selector());
    let first = transport.params_of("eth_call")[0][0]["data"].clone();
    assert!(first.as_str().unwrap().starts_with(&format!("0x{}", selector)));

    // the same interface has no ERC-20 balanceOf
    let result = token_balance(&client, &vault, &owner()).await;
    assert!(matches!(result, Err(SdkError::Abi(_))));
}

/// Test that an empty call result is an ABI error, not a zero
#[tokio::test]
async fn test_call_empty_output() {
    let client = ChainClient::new_mock();
    let result = Contract::erc20(token())
        .call(&client, "totalSupply", &[], BlockId::Latest)
        .await;
    assert!(matches!(result, Err(SdkError::Abi(_))));
}

/// Test a string-returning view
#[tokio::test]
async fn test_call_symbol() {
    let transport = MockTransport::new();
    let output = encode(&[ParamType::String], &[Token::string("USDC")]).unwrap();
    transport.set_response("eth_call", json!(format!("0x{}", hex::encode(output))));
    let client = ChainClient::with_transport(transport);

    let tokens = Contract::erc20(token())
        .call(&client, "symbol", &[], BlockId::Latest)
        .await
        .unwrap();
    assert_eq!(tokens, vec![Token::string("USDC")]);
}

/// Test that an unknown function fails without touching the node
#[tokio::test]
async fn test_unknown_function() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone());

    let result = Contract::erc20(token())
        .call(&client, "mint", &[], BlockId::Latest)
        .await;
    assert!(matches!(result, Err(SdkError::Abi(_))));
    assert!(transport.calls().is_empty());
}

/// Test that a wrong argument count fails without touching the node
#[tokio::test]
async fn test_wrong_argument_count() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone());

    let result = Contract::erc20(token())
        .call(&client, "balanceOf", &[], BlockId::Latest)
        .await;
    assert!(matches!(result, Err(SdkError::Abi(_))));
    assert!(transport.calls().is_empty());
}

// ==================== Writes ====================

/// Test that a token transfer is signed to the token with encoded calldata
#[tokio::test]
async fn test_send_transfer() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone()).with_chain_id(1);
    let key = PrivateKey::from_hex(KEY).unwrap();
    let recipient = owner();

    let sent = Contract::erc20(token())
        .send(
            &TxBuilder::new(&client),
            &key,
            "transfer",
            &[Token::Address(recipient), Token::Uint(U256::from(1_000u64))],
            U256::zero(),
        )
        .await
        .unwrap();

    let tx = sent.signed.tx();
    assert_eq!(tx.to, Some(token()));
    assert_eq!(&tx.data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    assert_eq!(tx.data.len(), 4 + 64);
    assert_eq!(sent.signed.sender(), key.address());
    assert_eq!(transport.call_count("eth_sendRawTransaction"), 1);
}

/// Test that a reverting estimate keeps the write off the chain
#[tokio::test]
async fn test_send_estimate_revert() {
    let transport = MockTransport::new();
    transport.set_rpc_error("eth_estimateGas", 3, "execution reverted: insufficient balance");
    let client = ChainClient::with_transport(transport.clone()).with_chain_id(1);
    let key = PrivateKey::from_hex(KEY).unwrap();

    let result = Contract::erc20(token())
        .send(
            &TxBuilder::new(&client),
            &key,
            "transfer",
            &[Token::Address(owner()), Token::Uint(U256::from(1u64))],
            U256::zero(),
        )
        .await;

    assert!(matches!(result, Err(SdkError::Estimation(_))));
    assert_eq!(transport.call_count("eth_sendRawTransaction"), 0);
}
