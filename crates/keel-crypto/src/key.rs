//! Private key handling

use k256::ecdsa::SigningKey;
use keel_primitives::{Address, H256};
use zeroize::Zeroize;

use crate::{public_key_to_address, sign, CryptoError, PublicKey, Signature};

/// secp256k1 private key bound to its derived address.
///
/// Clone is not implemented so key material is never duplicated by accident.
/// The Debug output carries the address only.
pub struct PrivateKey {
    inner: SigningKey,
    address: Address,
}

impl PrivateKey {
    /// Create a key from 32 raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let inner = SigningKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidPrivateKey("scalar out of range".to_string()))?;
        let address = public_key_to_address(inner.verifying_key());
        Ok(Self { inner, address })
    }

    /// Create a key from a hex string, with or without "0x" prefix
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut bytes = hex::decode(hex)
            .map_err(|_| CryptoError::InvalidPrivateKey("not valid hex".to_string()))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                len
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();

        let result = Self::from_bytes(&key);
        key.zeroize();
        result
    }

    /// Address controlled by this key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Public half of the key
    pub fn public_key(&self) -> PublicKey {
        *self.inner.verifying_key()
    }

    /// Sign a 32-byte hash
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, CryptoError> {
        sign(hash, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_from_hex_known_address() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        assert_eq!(
            key.address().to_hex(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_from_hex_no_prefix() {
        let key = PrivateKey::from_hex(&TEST_KEY[2..]).unwrap();
        assert_eq!(
            key.address().to_hex(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_length() {
        assert!(matches!(
            PrivateKey::from_hex("0x1234"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_zero_key_rejected() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let key = PrivateKey::from_hex(TEST_KEY).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("address"));
        assert!(!debug.contains("ac0974"));
    }
}
