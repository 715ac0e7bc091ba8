//! Legacy transactions with EIP-155 replay protection

use bytes::Bytes;
use keel_crypto::{keccak256, recover_address, CryptoError, PrivateKey, Signature};
use keel_primitives::{Address, H256, U256};
use rlp::{DecoderError, Rlp, RlpStream};
use thiserror::Error;

/// Transaction encoding/decoding error
#[derive(Debug, Error)]
pub enum TxCodecError {
    /// Malformed RLP
    #[error("rlp error: {0}")]
    Rlp(#[from] DecoderError),

    /// Typed (EIP-2718) envelopes are not handled
    #[error("unsupported transaction type: 0x{0:02x}")]
    UnsupportedType(u8),

    /// Chain id of zero, or one too large to fit into `v`
    #[error("invalid chain id: {0}")]
    InvalidChainId(u64),

    /// `v` is not an EIP-155 value
    #[error("invalid v value: {0}")]
    InvalidV(u64),

    /// Bytes left over after the transaction list
    #[error("trailing bytes after transaction")]
    TrailingBytes,

    /// Signing or recovery failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Unsigned legacy transaction body
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LegacyTx {
    /// Sender nonce
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Call data or init code
    pub data: Bytes,
}

impl LegacyTx {
    /// Whether this transaction creates a contract
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// EIP-155 signing hash:
    /// `keccak(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let mut s = RlpStream::new_list(9);
        self.append_body(&mut s);
        s.append(&chain_id);
        s.append(&0u8);
        s.append(&0u8);
        keccak256(&s.out())
    }

    /// Sign with `key` for `chain_id`.
    ///
    /// Signing is deterministic: the same body, chain id and key always give
    /// the same payload.
    pub fn sign(self, chain_id: u64, key: &PrivateKey) -> Result<SignedTransaction, TxCodecError> {
        if chain_id == 0 || chain_id > (u64::MAX - 36) / 2 {
            return Err(TxCodecError::InvalidChainId(chain_id));
        }

        let signature = key.sign_hash(&self.signing_hash(chain_id))?;
        let signature = TxSignature {
            v: signature.recovery_id as u64 + 35 + 2 * chain_id,
            r: H256::from_bytes(signature.r),
            s: H256::from_bytes(signature.s),
        };

        Ok(SignedTransaction::assemble(self, signature, chain_id, key.address()))
    }

    fn append_body(&self, s: &mut RlpStream) {
        s.append(&self.nonce);
        s.append(&self.gas_price);
        s.append(&self.gas_limit);
        match &self.to {
            Some(to) => s.append(to),
            None => s.append_empty_data(),
        };
        s.append(&self.value);
        s.append(&self.data.to_vec());
    }
}

/// Signature components as carried in the payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSignature {
    /// `recovery_id + 35 + 2 * chain_id`
    pub v: u64,
    /// R component
    pub r: H256,
    /// S component
    pub s: H256,
}

impl TxSignature {
    /// Split `v` into chain id and recovery id
    pub fn chain_and_recovery_id(&self) -> Result<(u64, u8), TxCodecError> {
        if self.v < 37 {
            return Err(TxCodecError::InvalidV(self.v));
        }
        let chain_id = (self.v - 35) / 2;
        let recovery_id = ((self.v - 35) % 2) as u8;
        Ok((chain_id, recovery_id))
    }
}

/// Signed legacy transaction.
///
/// Only produced by [`LegacyTx::sign`] or [`SignedTransaction::decode`], so the
/// payload, hash and sender always agree with the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: LegacyTx,
    signature: TxSignature,
    chain_id: u64,
    sender: Address,
    raw: Bytes,
    hash: H256,
}

impl SignedTransaction {
    fn assemble(tx: LegacyTx, signature: TxSignature, chain_id: u64, sender: Address) -> Self {
        let mut s = RlpStream::new_list(9);
        tx.append_body(&mut s);
        s.append(&signature.v);
        s.append(&U256::from_big_endian(signature.r.as_bytes()));
        s.append(&U256::from_big_endian(signature.s.as_bytes()));
        let raw = s.out().freeze();
        let hash = keccak256(&raw);

        Self {
            tx,
            signature,
            chain_id,
            sender,
            raw,
            hash,
        }
    }

    /// Decode a raw payload and recover its sender
    pub fn decode(raw: &[u8]) -> Result<Self, TxCodecError> {
        match raw.first() {
            None => return Err(DecoderError::RlpIsTooShort.into()),
            Some(&first) if first < 0x80 => return Err(TxCodecError::UnsupportedType(first)),
            _ => {}
        }

        let rlp = Rlp::new(raw);
        if !rlp.is_list() {
            return Err(DecoderError::RlpExpectedToBeList.into());
        }
        let info = rlp.payload_info()?;
        if info.header_len + info.value_len != raw.len() {
            return Err(TxCodecError::TrailingBytes);
        }
        if rlp.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen.into());
        }

        let to_item = rlp.at(3)?;
        let to = if to_item.is_empty() {
            None
        } else {
            Some(to_item.as_val::<Address>()?)
        };

        let tx = LegacyTx {
            nonce: rlp.val_at(0)?,
            gas_price: rlp.val_at(1)?,
            gas_limit: rlp.val_at(2)?,
            to,
            value: rlp.val_at(4)?,
            data: Bytes::from(rlp.val_at::<Vec<u8>>(5)?),
        };

        let v: u64 = rlp.val_at(6)?;
        let r = u256_to_h256(rlp.val_at(7)?);
        let s = u256_to_h256(rlp.val_at(8)?);
        let signature = TxSignature { v, r, s };

        let (chain_id, recovery_id) = signature.chain_and_recovery_id()?;
        let recoverable = Signature::new(*r.as_bytes(), *s.as_bytes(), recovery_id);
        if !recoverable.is_low_s() {
            return Err(CryptoError::InvalidSignature("high s value".to_string()).into());
        }
        let sender = recover_address(&tx.signing_hash(chain_id), &recoverable)?;

        Ok(Self {
            tx,
            signature,
            chain_id,
            sender,
            raw: Bytes::copy_from_slice(raw),
            hash: keccak256(raw),
        })
    }

    /// Unsigned body
    pub fn tx(&self) -> &LegacyTx {
        &self.tx
    }

    /// Signature components
    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    /// Chain id the transaction is bound to
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Signer address
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// RLP payload as sent to `eth_sendRawTransaction`
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Keccak hash of the payload, the transaction hash
    pub fn hash(&self) -> H256 {
        self.hash
    }
}

fn u256_to_h256(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-155 example transaction
    fn eip155_example() -> (LegacyTx, PrivateKey) {
        let tx = LegacyTx {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 21000,
            to: Some(Address::from_bytes([0x35; 20])),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Bytes::new(),
        };
        let key = PrivateKey::from_bytes(&[0x46; 32]).unwrap();
        (tx, key)
    }

    // ==================== Signing ====================

    #[test]
    fn test_eip155_signing_hash() {
        let (tx, _) = eip155_example();
        assert_eq!(
            tx.signing_hash(1).to_hex(),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_payload() {
        let (tx, key) = eip155_example();
        let signed = tx.sign(1, &key).unwrap();

        assert_eq!(
            hex::encode(signed.raw()),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(signed.signature().v, 37);
        assert_eq!(signed.hash(), keccak256(signed.raw()));
    }

    #[test]
    fn test_body_with_data_is_complete_list() {
        let key = PrivateKey::from_bytes(&[0x22; 32]).unwrap();
        let tx = LegacyTx {
            nonce: 0,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 60_000,
            to: Some(Address::from_bytes([0xbb; 20])),
            value: U256::from(20_000_000_000_000_000u64),
            data: Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb, 0x00]),
        };
        let signed = tx.sign(1, &key).unwrap();

        let rlp = Rlp::new(signed.raw());
        assert_eq!(rlp.item_count().unwrap(), 9);
        assert_eq!(rlp.val_at::<Vec<u8>>(5).unwrap(), vec![0xa9, 0x05, 0x9c, 0xbb, 0x00]);
        assert_eq!(rlp.val_at::<u64>(6).unwrap(), signed.signature().v);
    }

    #[test]
    fn test_zero_chain_id_rejected() {
        let (tx, key) = eip155_example();
        assert!(matches!(tx.sign(0, &key), Err(TxCodecError::InvalidChainId(0))));
    }

    #[test]
    fn test_v_encodes_chain_id() {
        let (tx, key) = eip155_example();
        let signed = tx.sign(1337, &key).unwrap();
        let v = signed.signature().v;
        assert!(v == 35 + 2 * 1337 || v == 36 + 2 * 1337);
    }

    // ==================== Decoding ====================

    #[test]
    fn test_decode_recovers_sender() {
        let (tx, key) = eip155_example();
        let signed = tx.clone().sign(1, &key).unwrap();
        let decoded = SignedTransaction::decode(signed.raw()).unwrap();

        assert_eq!(decoded.tx(), &tx);
        assert_eq!(decoded.chain_id(), 1);
        assert_eq!(decoded.sender(), key.address());
        assert_eq!(decoded.hash(), signed.hash());
        assert_eq!(decoded, signed);
    }

    #[test]
    fn test_decode_contract_creation() {
        let key = PrivateKey::from_bytes(&[0x11; 32]).unwrap();
        let tx = LegacyTx {
            nonce: 0,
            gas_price: U256::from(1u64),
            gas_limit: 100_000,
            to: None,
            value: U256::zero(),
            data: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
        };
        let signed = tx.sign(5, &key).unwrap();
        let decoded = SignedTransaction::decode(signed.raw()).unwrap();

        assert!(decoded.tx().is_contract_creation());
        assert_eq!(decoded.tx().data.as_ref(), &[0x60, 0x80, 0x60, 0x40]);
    }

    #[test]
    fn test_decode_rejects_typed_envelope() {
        assert!(matches!(
            SignedTransaction::decode(&[0x02, 0xc0]),
            Err(TxCodecError::UnsupportedType(0x02))
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let (tx, key) = eip155_example();
        let mut raw = tx.sign(1, &key).unwrap().raw().to_vec();
        raw.push(0x00);
        assert!(matches!(
            SignedTransaction::decode(&raw),
            Err(TxCodecError::TrailingBytes)
        ));
    }

    #[test]
    fn test_decode_rejects_pre_eip155_v() {
        let sig = TxSignature {
            v: 27,
            r: H256::from_bytes([1; 32]),
            s: H256::from_bytes([1; 32]),
        };
        assert!(matches!(
            sig.chain_and_recovery_id(),
            Err(TxCodecError::InvalidV(27))
        ));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(matches!(
            SignedTransaction::decode(&[]),
            Err(TxCodecError::Rlp(_))
        ));
    }
}
