//! Parsing of canonical type strings

use super::types::ParamType;
use crate::SdkError;

/// Parse a type string such as `uint256`, `bytes32[]`, `(address,uint8)[2]`
pub fn parse_type(s: &str) -> Result<ParamType, SdkError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(SdkError::Abi("empty type".to_string()));
    }

    // Array suffixes bind last: `T[2][]` is a dynamic array of `T[2]`
    if let Some(body) = s.strip_suffix(']') {
        let open = body
            .rfind('[')
            .ok_or_else(|| SdkError::Abi(format!("unbalanced brackets in {}", s)))?;
        let inner = parse_type(&body[..open])?;
        return apply_array_suffix(inner, &body[open + 1..], s);
    }

    if let Some(body) = s.strip_prefix('(') {
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| SdkError::Abi(format!("unbalanced parentheses in {}", s)))?;
        return split_top_level(body)?
            .into_iter()
            .map(parse_type)
            .collect::<Result<Vec<_>, _>>()
            .map(ParamType::Tuple);
    }

    parse_elementary(s)
}

fn apply_array_suffix(inner: ParamType, size: &str, whole: &str) -> Result<ParamType, SdkError> {
    if size.is_empty() {
        return Ok(ParamType::Array(Box::new(inner)));
    }
    let size: usize = size
        .parse()
        .map_err(|_| SdkError::Abi(format!("invalid array size in {}", whole)))?;
    if size == 0 {
        return Err(SdkError::Abi(format!("zero-length array in {}", whole)));
    }
    Ok(ParamType::FixedArray(Box::new(inner), size))
}

/// Apply every `[..]` group in `suffix` (e.g. `"[][3]"`) to `base`, left to right
pub(crate) fn apply_array_suffixes(base: ParamType, suffix: &str) -> Result<ParamType, SdkError> {
    let mut result = base;
    let mut rest = suffix;
    while !rest.is_empty() {
        let body = rest
            .strip_prefix('[')
            .ok_or_else(|| SdkError::Abi(format!("invalid array suffix {}", suffix)))?;
        let close = body
            .find(']')
            .ok_or_else(|| SdkError::Abi(format!("invalid array suffix {}", suffix)))?;
        result = apply_array_suffix(result, &body[..close], suffix)?;
        rest = &body[close + 1..];
    }
    Ok(result)
}

fn split_top_level(body: &str) -> Result<Vec<&str>, SdkError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return Err(SdkError::Abi(format!("unbalanced parentheses in ({})", body)));
        }
    }
    if depth != 0 {
        return Err(SdkError::Abi(format!("unbalanced parentheses in ({})", body)));
    }
    parts.push(&body[start..]);
    Ok(parts)
}

fn parse_elementary(s: &str) -> Result<ParamType, SdkError> {
    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        "function" => return Ok(ParamType::FixedBytes(24)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return parse_bits(rest, s).map(ParamType::Uint);
    }
    if let Some(rest) = s.strip_prefix("int") {
        return parse_bits(rest, s).map(ParamType::Int);
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| SdkError::Abi(format!("invalid bytes size: {}", s)))?;
        if !(1..=32).contains(&size) {
            return Err(SdkError::Abi(format!("invalid bytes size: {}", s)));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(SdkError::Abi(format!("unknown type: {}", s)))
}

fn parse_bits(rest: &str, whole: &str) -> Result<usize, SdkError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| SdkError::Abi(format!("invalid integer size: {}", whole)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(SdkError::Abi(format!("invalid integer size: {}", whole)));
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elementary() {
        assert_eq!(parse_type("address").unwrap(), ParamType::Address);
        assert_eq!(parse_type("uint256").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(parse_type("int").unwrap(), ParamType::Int(256));
        assert_eq!(parse_type("bool").unwrap(), ParamType::Bool);
        assert_eq!(parse_type("bytes").unwrap(), ParamType::Bytes);
        assert_eq!(parse_type("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(parse_type("string").unwrap(), ParamType::String);
    }

    #[test]
    fn test_parse_arrays() {
        assert_eq!(
            parse_type("uint256[]").unwrap(),
            ParamType::Array(Box::new(ParamType::Uint(256)))
        );
        assert_eq!(
            parse_type("address[3]").unwrap(),
            ParamType::FixedArray(Box::new(ParamType::Address), 3)
        );
        assert_eq!(
            parse_type("string[2][]").unwrap(),
            ParamType::Array(Box::new(ParamType::FixedArray(Box::new(ParamType::String), 2)))
        );
    }

    #[test]
    fn test_parse_tuples() {
        assert_eq!(
            parse_type("(address,(bool,bytes)[])").unwrap(),
            ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Array(Box::new(ParamType::Tuple(vec![
                    ParamType::Bool,
                    ParamType::Bytes
                ]))),
            ])
        );
        assert_eq!(parse_type("()").unwrap(), ParamType::Tuple(vec![]));
    }

    #[test]
    fn test_display_parse_agree() {
        for s in ["uint8[2][]", "(address,(bool,bytes)[])[3]", "bytes4", "int128"] {
            assert_eq!(parse_type(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "uint7", "uint264", "bytes0", "bytes33", "foo", "uint256[", "uint256[0]", "(bool", "bool)", "uint256[x]"] {
            assert!(
                matches!(parse_type(bad), Err(SdkError::Abi(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_apply_array_suffixes() {
        assert_eq!(
            apply_array_suffixes(ParamType::Bool, "[][2]").unwrap(),
            ParamType::FixedArray(Box::new(ParamType::Array(Box::new(ParamType::Bool))), 2)
        );
        assert!(apply_array_suffixes(ParamType::Bool, "x").is_err());
    }
}
