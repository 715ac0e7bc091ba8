//! Contract interaction helpers

use bytes::Bytes;
use keel_crypto::PrivateKey;
use keel_primitives::{Address, U256};

use crate::abi::{Abi, Event, Function, Param, ParamType, StateMutability, Token};
use crate::tx_builder::{TransactionIntent, TxBuilder};
use crate::types::{BlockId, CallRequest, SentTransaction};
use crate::units::UnitAmount;
use crate::{ChainClient, SdkError};

/// A deployed contract: its address and interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    address: Address,
    abi: Abi,
}

impl Contract {
    /// Create a contract handle
    pub fn new(address: Address, abi: Abi) -> Self {
        Self { address, abi }
    }

    /// Standard ERC-20 interface at `address`
    pub fn erc20(address: Address) -> Self {
        Self::new(address, erc20_abi())
    }

    /// Get the contract address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Get the contract interface
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Resolve a function by name or full signature
    pub fn function(&self, name_or_signature: &str) -> Result<&Function, SdkError> {
        self.abi.function(name_or_signature)
    }

    /// Encode a function call
    pub fn encode_call(&self, function: &str, args: &[Token]) -> Result<Bytes, SdkError> {
        self.function(function)?.encode_input(args)
    }

    /// Decode function output
    pub fn decode_output(&self, function: &str, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        self.function(function)?.decode_output(data)
    }

    // ==================== Reads ====================

    /// Execute `function` with `eth_call` and decode its outputs.
    ///
    /// Nothing is signed or broadcast.
    pub async fn call(
        &self,
        client: &ChainClient,
        function: &str,
        args: &[Token],
        block: BlockId,
    ) -> Result<Vec<Token>, SdkError> {
        let function = self.function(function)?;
        let request = CallRequest {
            to: Some(self.address),
            data: Some(function.encode_input(args)?),
            ..Default::default()
        };

        let output = client.call(&request, block).await?;
        function.decode_output(&output)
    }

    /// Read an amount and the number of decimals it is denominated in, then
    /// combine them.
    ///
    /// Both functions must return a single uint. The two calls are issued
    /// concurrently against the latest block.
    pub async fn scaled_read(
        &self,
        client: &ChainClient,
        amount_function: &str,
        amount_args: &[Token],
        decimals_function: &str,
    ) -> Result<UnitAmount, SdkError> {
        let (amount, decimals) = tokio::join!(
            self.call(client, amount_function, amount_args, BlockId::Latest),
            self.call(client, decimals_function, &[], BlockId::Latest),
        );

        let amount = single_uint(amount?, amount_function)?;
        let decimals = single_uint(decimals?, decimals_function)?;
        let decimals = u8::try_from(decimals)
            .map_err(|_| SdkError::Abi(format!("decimals {} out of range", decimals)))?;

        Ok(UnitAmount::new(amount, decimals))
    }

    // ==================== Writes ====================

    /// Build, sign and broadcast a call to `function` from `sender_key`.
    ///
    /// Returns once the node accepts the payload; the receipt is not awaited.
    pub async fn send(
        &self,
        builder: &TxBuilder<'_>,
        sender_key: &PrivateKey,
        function: &str,
        args: &[Token],
        value: U256,
    ) -> Result<SentTransaction, SdkError> {
        let function = self.function(function)?;
        let intent = TransactionIntent::new(sender_key.address())
            .to(self.address)
            .value(value)
            .data(function.encode_input(args)?);

        let signed = builder.build(intent, sender_key).await?;
        let hash = builder.client().send_raw_transaction(signed.raw()).await?;
        tracing::info!("sent {} to {}", function.signature(), self.address);
        Ok(SentTransaction { hash, signed })
    }
}

/// Balance of `owner` in `token`, scaled by the token's own decimals.
///
/// `token` is any contract exposing `balanceOf(address)` and `decimals()`.
pub async fn token_balance(
    client: &ChainClient,
    token: &Contract,
    owner: &Address,
) -> Result<UnitAmount, SdkError> {
    token
        .scaled_read(client, "balanceOf", &[Token::Address(*owner)], "decimals")
        .await
}

fn single_uint(tokens: Vec<Token>, function: &str) -> Result<U256, SdkError> {
    tokens
        .first()
        .and_then(Token::as_uint)
        .ok_or_else(|| SdkError::Abi(format!("{} returned no uint", function)))
}

fn view(name: &str, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Function {
    Function::new(name, inputs, outputs).with_mutability(StateMutability::View)
}

/// Interface of a standard ERC-20 token
pub fn erc20_abi() -> Abi {
    let transfer_params = vec![
        Param::indexed("from", ParamType::Address),
        Param::indexed("to", ParamType::Address),
        Param::new("value", ParamType::Uint(256)),
    ];
    let approval_params = vec![
        Param::indexed("owner", ParamType::Address),
        Param::indexed("spender", ParamType::Address),
        Param::new("value", ParamType::Uint(256)),
    ];

    Abi {
        constructor: None,
        functions: vec![
            view("name", vec![], vec![ParamType::String]),
            view("symbol", vec![], vec![ParamType::String]),
            view("decimals", vec![], vec![ParamType::Uint(8)]),
            view("totalSupply", vec![], vec![ParamType::Uint(256)]),
            view("balanceOf", vec![ParamType::Address], vec![ParamType::Uint(256)]),
            view(
                "allowance",
                vec![ParamType::Address, ParamType::Address],
                vec![ParamType::Uint(256)],
            ),
            Function::new(
                "transfer",
                vec![ParamType::Address, ParamType::Uint(256)],
                vec![ParamType::Bool],
            ),
            Function::new(
                "approve",
                vec![ParamType::Address, ParamType::Uint(256)],
                vec![ParamType::Bool],
            ),
            Function::new(
                "transferFrom",
                vec![ParamType::Address, ParamType::Address, ParamType::Uint(256)],
                vec![ParamType::Bool],
            ),
        ],
        events: vec![
            Event::new("Transfer", transfer_params),
            Event::new("Approval", approval_params),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erc20_selectors() {
        let token = Contract::erc20(Address::ZERO);
        assert_eq!(token.function("transfer").unwrap().selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(token.function("balanceOf").unwrap().selector(), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(token.function("approve").unwrap().selector(), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(token.function("decimals").unwrap().selector(), [0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_encode_call() {
        let token = Contract::erc20(Address::ZERO);
        let owner = Address::from_bytes([0x42; 20]);
        let data = token
            .encode_call("balanceOf", &[Token::Address(owner)])
            .unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(&data[16..36], owner.as_bytes());
    }

    #[test]
    fn test_unknown_function() {
        let token = Contract::erc20(Address::ZERO);
        assert!(matches!(token.encode_call("mint", &[]), Err(SdkError::Abi(_))));
    }

    #[test]
    fn test_decode_output() {
        let token = Contract::erc20(Address::ZERO);
        let mut data = [0u8; 32];
        data[31] = 1;
        assert_eq!(
            token.decode_output("transfer", &data).unwrap(),
            vec![Token::Bool(true)]
        );
    }
}
