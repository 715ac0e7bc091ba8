//! # keel-crypto
//!
//! Cryptographic primitives for keel.
//!
//! - Keccak-256 hashing
//! - Deterministic ECDSA signing over secp256k1 (RFC 6979, low-s)
//! - Public key recovery
//! - Address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod key;
mod signature;

pub use error::CryptoError;
pub use hash::keccak256;
pub use key::PrivateKey;
pub use signature::{
    public_key_to_address, recover_address, recover_public_key, sign, verify, PublicKey,
    Signature,
};
