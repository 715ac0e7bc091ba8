//! # keel-primitives
//!
//! Primitive types shared by every keel crate.
//!
//! - [`Address`]: 20-byte account address with EIP-55 checksum support
//! - [`H256`]: 32-byte hash
//! - [`U256`]: 256-bit unsigned integer (re-exported from `primitive-types`)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{Hash, HashError, H256};

pub use primitive_types::U256;

/// Block height type
pub type BlockNumber = u64;

/// Transaction nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;
