//! ABI encoding and decoding for Solidity contracts
//!
//! This module provides functionality for:
//! - Parsing canonical type strings and JSON ABI documents
//! - Encoding function calls and constructor arguments
//! - Decoding return values and event logs
//! - Computing function selectors and event topics
//!
//! # Example
//!
//! ```rust
//! use keel_sdk::abi::{decode, encode, parse_type, Token};
//! use keel_primitives::{Address, U256};
//!
//! let types = [parse_type("address").unwrap(), parse_type("uint256[]").unwrap()];
//! let tokens = [
//!     Token::Address(Address::ZERO),
//!     Token::Array(vec![Token::Uint(U256::from(1)), Token::Uint(U256::from(2))]),
//! ];
//!
//! let data = encode(&types, &tokens).unwrap();
//! assert_eq!(decode(&types, &data).unwrap(), tokens);
//! ```

mod decode;
mod encode;
mod event;
mod function;
mod json;
mod parse;
mod types;

pub use decode::decode;
pub use encode::{encode, encode_function_call, function_selector};
pub use event::Event;
pub use function::{Constructor, Function, Param, StateMutability};
pub use json::Abi;
pub use parse::parse_type;
pub use types::{I256, ParamType, Token};
