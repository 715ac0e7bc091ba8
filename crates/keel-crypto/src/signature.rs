//! ECDSA signature operations using secp256k1

use std::cmp::Ordering;

use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use keel_primitives::{Address, H256};

use crate::{keccak256, CryptoError, PrivateKey};

/// Half of the secp256k1 curve order (n/2)
const SECP256K1_N_DIV_2: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D,
    0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Full secp256k1 curve order (n)
const SECP256K1_N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B,
    0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// ECDSA signature with recovery id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// Recovery id, 0 or 1
    pub recovery_id: u8,
}

/// Uncompressed secp256k1 public key
pub type PublicKey = VerifyingKey;

impl Signature {
    /// Create signature from r, s and a recovery id
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Signature { r, s, recovery_id }
    }

    /// Check if signature has low-s value (EIP-2)
    pub fn is_low_s(&self) -> bool {
        self.s.cmp(&SECP256K1_N_DIV_2) != Ordering::Greater
    }
}

/// n - s, used to flip a high-s signature into the low half
fn subtract_from_n(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: u16 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_N[i] as u16)
            .wrapping_sub(s[i] as u16)
            .wrapping_sub(borrow);
        result[i] = diff as u8;
        borrow = if diff > 255 { 1 } else { 0 };
    }

    result
}

/// Sign a 32-byte message hash.
///
/// Nonces are derived per RFC 6979, so the same key and hash always yield the
/// same signature. The result is normalized to low-s.
pub fn sign(message_hash: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (signature, mut recovery_id) = private_key
        .signing_key()
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let r: [u8; 32] = signature.r().to_bytes().into();
    let mut s: [u8; 32] = signature.s().to_bytes().into();

    if s.cmp(&SECP256K1_N_DIV_2) == Ordering::Greater {
        s = subtract_from_n(&s);
        recovery_id = RecoveryId::try_from(recovery_id.to_byte() ^ 1).map_err(|_| {
            CryptoError::SigningFailed("invalid recovery id after normalization".to_string())
        })?;
    }

    Ok(Signature::new(r, s, recovery_id.to_byte()))
}

/// Verify a signature against a message hash and public key
pub fn verify(
    message_hash: &H256,
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<bool, CryptoError> {
    if !signature.is_low_s() {
        return Ok(false);
    }

    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    let k256_sig = to_k256(signature)?;
    Ok(public_key
        .verify_prehash(message_hash.as_bytes(), &k256_sig)
        .is_ok())
}

/// Recover public key from signature and message hash
pub fn recover_public_key(
    message_hash: &H256,
    signature: &Signature,
) -> Result<PublicKey, CryptoError> {
    let k256_sig = to_k256(signature)?;
    let recovery_id = RecoveryId::try_from(signature.recovery_id)
        .map_err(|_| CryptoError::InvalidRecoveryId(signature.recovery_id))?;

    VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &k256_sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Recover the signer's address from signature and message hash
pub fn recover_address(message_hash: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    recover_public_key(message_hash, signature).map(|key| public_key_to_address(&key))
}

/// Derive Ethereum address from public key
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    // 0x04 || x || y
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut addr_bytes = [0u8; 20];
    addr_bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(addr_bytes)
}

fn to_k256(signature: &Signature) -> Result<K256Signature, CryptoError> {
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    K256Signature::from_scalars(r, s).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> PrivateKey {
        PrivateKey::from_hex("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
            .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let key = test_key();
        let hash = keccak256(b"test message");
        let signature = sign(&hash, &key).unwrap();

        assert!(signature.is_low_s());
        assert!(verify(&hash, &signature, &key.public_key()).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = test_key();
        let hash = keccak256(b"same input");
        assert_eq!(sign(&hash, &key).unwrap(), sign(&hash, &key).unwrap());
    }

    #[test]
    fn test_recover_address() {
        let key = test_key();
        let hash = keccak256(b"recover me");
        let signature = sign(&hash, &key).unwrap();

        assert_eq!(recover_address(&hash, &signature).unwrap(), key.address());
    }

    #[test]
    fn test_reject_high_s_signature() {
        let key = test_key();
        let hash = keccak256(b"test");
        let mut signature = sign(&hash, &key).unwrap();
        signature.s = [0xFF; 32];

        assert!(!verify(&hash, &signature, &key.public_key()).unwrap());
    }

    #[test]
    fn test_invalid_recovery_id() {
        let key = test_key();
        let hash = keccak256(b"test");
        let mut signature = sign(&hash, &key).unwrap();
        signature.recovery_id = 7;

        assert!(matches!(
            recover_public_key(&hash, &signature),
            Err(CryptoError::InvalidRecoveryId(7))
        ));
    }
}
