//! ABI encoding

use keel_primitives::U256;

use super::types::{ParamType, Token};
use crate::SdkError;

/// Encode tokens against their declared types.
///
/// Static values sit inline in 32-byte head slots; dynamic values are
/// appended to the tail with their offset, relative to the start of this
/// encoding, in the head. A count or type mismatch is an error; nothing is
/// coerced.
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    encode_params(types, tokens)
}

/// Encode function call (selector + params)
pub fn encode_function_call(
    selector: [u8; 4],
    types: &[ParamType],
    tokens: &[Token],
) -> Result<Vec<u8>, SdkError> {
    let mut result = selector.to_vec();
    result.extend(encode(types, tokens)?);
    Ok(result)
}

/// Compute function selector (first 4 bytes of keccak256(signature))
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keel_crypto::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

fn encode_params(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if types.len() != tokens.len() {
        return Err(SdkError::Abi(format!(
            "expected {} values, got {}",
            types.len(),
            tokens.len()
        )));
    }

    let head_size = types
        .iter()
        .try_fold(0usize, |total, t| total.checked_add(t.head_len()?))
        .ok_or_else(|| SdkError::Abi("encoding head too large".to_string()))?;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.iter().zip(tokens) {
        if param_type.is_dynamic() {
            head.extend(encode_u256(&U256::from(head_size + tail.len())));
            tail.extend(encode_token(param_type, token)?);
        } else {
            head.extend(encode_token(param_type, token)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_token(param_type: &ParamType, token: &Token) -> Result<Vec<u8>, SdkError> {
    match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => {
            let mut buf = [0u8; 32];
            buf[12..32].copy_from_slice(addr.as_bytes());
            Ok(buf.to_vec())
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if *bits < 256 && value.bits() > *bits {
                return Err(SdkError::Abi(format!("{} does not fit in uint{}", value, bits)));
            }
            Ok(encode_u256(value))
        }
        (ParamType::Int(bits), Token::Int(value)) => {
            if !value.fits(*bits) {
                return Err(SdkError::Abi(format!("{} does not fit in int{}", value, bits)));
            }
            Ok(encode_u256(&value.to_twos_complement()))
        }
        (ParamType::Bool, Token::Bool(b)) => {
            let mut buf = [0u8; 32];
            buf[31] = u8::from(*b);
            Ok(buf.to_vec())
        }
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            if data.len() != *size {
                return Err(SdkError::Abi(format!(
                    "bytes{} value has {} bytes",
                    size,
                    data.len()
                )));
            }
            let mut buf = [0u8; 32];
            buf[..data.len()].copy_from_slice(data);
            Ok(buf.to_vec())
        }
        (ParamType::Bytes, Token::Bytes(data)) => Ok(encode_bytes(data)),
        (ParamType::String, Token::String(s)) => Ok(encode_bytes(s.as_bytes())),
        (ParamType::Array(inner), Token::Array(tokens)) => {
            let mut result = encode_u256(&U256::from(tokens.len()));
            let inner_types = vec![(**inner).clone(); tokens.len()];
            result.extend(encode_params(&inner_types, tokens)?);
            Ok(result)
        }
        (ParamType::FixedArray(inner, size), Token::FixedArray(tokens)) => {
            if tokens.len() != *size {
                return Err(SdkError::Abi(format!(
                    "{} expects {} elements, got {}",
                    param_type,
                    size,
                    tokens.len()
                )));
            }
            let inner_types = vec![(**inner).clone(); *size];
            encode_params(&inner_types, tokens)
        }
        (ParamType::Tuple(types), Token::Tuple(tokens)) => encode_params(types, tokens),
        _ => Err(SdkError::Abi(format!(
            "cannot encode {} value as {}",
            token.kind(),
            param_type
        ))),
    }
}

fn encode_u256(value: &U256) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes.to_vec()
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut result = encode_u256(&U256::from(data.len()));

    let padded_len = data.len().div_ceil(32) * 32;
    let mut padded = vec![0u8; padded_len];
    padded[..data.len()].copy_from_slice(data);
    result.extend(padded);

    result
}
