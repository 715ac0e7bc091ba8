//! ABI decoding

use keel_primitives::{Address, U256};

use super::types::{ParamType, Token, I256};
use crate::SdkError;

/// Decode tokens from ABI-encoded data.
///
/// Dynamic offsets are resolved relative to the start of the encoding that
/// contains them, so nested dynamic values decode correctly. Any offset or
/// length pointing past the end of `data` is an error.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_params(types.iter(), data, 0)
}

fn decode_params<'t, I>(types: I, data: &[u8], base: usize) -> Result<Vec<Token>, SdkError>
where
    I: Iterator<Item = &'t ParamType>,
{
    let mut tokens = Vec::with_capacity(types.size_hint().0);
    let mut head = base;

    for param_type in types {
        let token = if param_type.is_dynamic() {
            let offset = read_len(data, head)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| out_of_bounds(data, usize::MAX))?;
            decode_at(param_type, data, start)?
        } else {
            decode_at(param_type, data, head)?
        };
        tokens.push(token);
        head = param_type
            .head_len()
            .and_then(|len| head.checked_add(len))
            .ok_or_else(|| out_of_bounds(data, usize::MAX))?;
    }

    Ok(tokens)
}

fn decode_at(param_type: &ParamType, data: &[u8], pos: usize) -> Result<Token, SdkError> {
    match param_type {
        ParamType::Address => {
            let word = read_word(data, pos)?;
            if word[..12].iter().any(|b| *b != 0) {
                return Err(SdkError::Abi("dirty high bytes in address".to_string()));
            }
            let mut addr_bytes = [0u8; 20];
            addr_bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address::from_bytes(addr_bytes)))
        }
        ParamType::Uint(bits) => {
            let value = U256::from_big_endian(read_word(data, pos)?);
            if value.bits() > *bits {
                return Err(SdkError::Abi(format!("value out of range for uint{}", bits)));
            }
            Ok(Token::Uint(value))
        }
        ParamType::Int(bits) => {
            let value = I256::from_twos_complement(U256::from_big_endian(read_word(data, pos)?));
            if !value.fits(*bits) {
                return Err(SdkError::Abi(format!("value out of range for int{}", bits)));
            }
            Ok(Token::Int(value))
        }
        ParamType::Bool => {
            let word = read_word(data, pos)?;
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(SdkError::Abi("invalid bool encoding".to_string()));
            }
            Ok(Token::Bool(word[31] == 1))
        }
        ParamType::FixedBytes(size) => {
            let word = read_word(data, pos)?;
            Ok(Token::FixedBytes(word[..*size].to_vec()))
        }
        ParamType::Bytes => decode_bytes(data, pos).map(|b| Token::Bytes(b.to_vec())),
        ParamType::String => {
            let bytes = decode_bytes(data, pos)?;
            let s = String::from_utf8(bytes.to_vec())
                .map_err(|e| SdkError::Abi(format!("invalid UTF-8: {}", e)))?;
            Ok(Token::String(s))
        }
        ParamType::Array(inner) => {
            let len = read_len(data, pos)?;
            let start = pos + 32;
            check_elements(inner, len, data, start)?;
            decode_params(std::iter::repeat(&**inner).take(len), data, start).map(Token::Array)
        }
        ParamType::FixedArray(inner, size) => {
            check_elements(inner, *size, data, pos)?;
            decode_params(std::iter::repeat(&**inner).take(*size), data, pos)
                .map(Token::FixedArray)
        }
        ParamType::Tuple(types) => decode_params(types.iter(), data, pos).map(Token::Tuple),
    }
}

/// Every element takes at least its head in `data`, so the element count is
/// bounded by the data before anything is allocated.
fn check_elements(
    inner: &ParamType,
    count: usize,
    data: &[u8],
    start: usize,
) -> Result<(), SdkError> {
    let element_len = inner
        .head_len()
        .ok_or_else(|| SdkError::Abi(format!("{} is too large", inner)))?;
    if element_len == 0 && count > 0 {
        return Err(SdkError::Abi(format!("zero-sized element type {}", inner)));
    }
    let needed = element_len
        .checked_mul(count)
        .and_then(|n| n.checked_add(start))
        .ok_or_else(|| out_of_bounds(data, usize::MAX))?;
    check_length(data, needed)
}

fn read_word(data: &[u8], pos: usize) -> Result<&[u8], SdkError> {
    let end = pos
        .checked_add(32)
        .ok_or_else(|| out_of_bounds(data, usize::MAX))?;
    check_length(data, end)?;
    Ok(&data[pos..end])
}

/// Read a word used as an offset or length; it must fit inside `data`
fn read_len(data: &[u8], pos: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(read_word(data, pos)?);
    if value > U256::from(data.len()) {
        return Err(SdkError::Abi(format!(
            "offset or length {} exceeds data of {} bytes",
            value,
            data.len()
        )));
    }
    Ok(value.as_usize())
}

fn decode_bytes(data: &[u8], pos: usize) -> Result<&[u8], SdkError> {
    let len = read_len(data, pos)?;
    let start = pos + 32;
    let end = start
        .checked_add(len)
        .ok_or_else(|| out_of_bounds(data, usize::MAX))?;
    check_length(data, end)?;
    Ok(&data[start..end])
}

fn check_length(data: &[u8], required: usize) -> Result<(), SdkError> {
    if data.len() < required {
        return Err(out_of_bounds(data, required));
    }
    Ok(())
}

fn out_of_bounds(data: &[u8], required: usize) -> SdkError {
    SdkError::Abi(format!(
        "insufficient data: need {} bytes, have {}",
        required,
        data.len()
    ))
}
