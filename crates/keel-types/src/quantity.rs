//! JSON-RPC hex quantities and data.
//!
//! Quantities are `0x`-prefixed big-endian hex without leading zeros (`0x0`
//! for zero). Data is `0x`-prefixed hex of arbitrary even length. The serde
//! submodules plug these into `#[serde(with = "...")]` fields.

use bytes::Bytes;
use keel_primitives::U256;

fn strip_prefix(s: &str) -> Result<&str, String> {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| format!("missing 0x prefix: {}", s))
}

/// Parse a hex quantity into a U256
pub fn parse_u256(s: &str) -> Result<U256, String> {
    let body = strip_prefix(s)?;
    if body.is_empty() {
        return Err("empty quantity".to_string());
    }
    U256::from_str_radix(body, 16).map_err(|e| format!("invalid quantity {}: {:?}", s, e))
}

/// Parse a hex quantity into a u64, rejecting values that do not fit
pub fn parse_u64(s: &str) -> Result<u64, String> {
    let value = parse_u256(s)?;
    if value > U256::from(u64::MAX) {
        return Err(format!("quantity {} does not fit in 64 bits", s));
    }
    Ok(value.as_u64())
}

/// Parse hex data into bytes
pub fn parse_bytes(s: &str) -> Result<Bytes, String> {
    let body = strip_prefix(s)?;
    hex::decode(body)
        .map(Bytes::from)
        .map_err(|e| format!("invalid hex data: {}", e))
}

/// Format a u64 as a hex quantity
pub fn format_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Format a U256 as a hex quantity
pub fn format_u256(value: &U256) -> String {
    format!("0x{:x}", value)
}

/// Format bytes as hex data
pub fn format_bytes(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// `u64` as hex quantity
pub mod u64_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_u64(*value))
    }

    /// Deserialize
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_u64(&s).map_err(de::Error::custom)
    }
}

/// `Option<u64>` as hex quantity or null
pub mod opt_u64_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize
    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&super::format_u64(*v)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse_u64(&s).map_err(de::Error::custom))
            .transpose()
    }
}

/// `U256` as hex quantity
pub mod u256_hex {
    use keel_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_u256(value))
    }

    /// Deserialize
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_u256(&s).map_err(de::Error::custom)
    }
}

/// `Option<U256>` as hex quantity or null
pub mod opt_u256_hex {
    use keel_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize
    pub fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&super::format_u256(v)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse_u256(&s).map_err(de::Error::custom))
            .transpose()
    }
}

/// `Bytes` as hex data
pub mod bytes_hex {
    use bytes::Bytes;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize
    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_bytes(value))
    }

    /// Deserialize
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_bytes(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("0x0").unwrap(), 0);
        assert_eq!(parse_u64("0x5208").unwrap(), 21000);
        assert_eq!(parse_u64("0xffffffffffffffff").unwrap(), u64::MAX);
    }

    #[test]
    fn test_parse_u64_overflow() {
        assert!(parse_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn test_parse_requires_prefix() {
        assert!(parse_u64("5208").is_err());
        assert!(parse_u256("0x").is_err());
    }

    #[test]
    fn test_parse_u256_wei() {
        assert_eq!(
            parse_u256("0xde0b6b3a7640000").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_format_quantities() {
        assert_eq!(format_u64(0), "0x0");
        assert_eq!(format_u64(256), "0x100");
        assert_eq!(format_u256(&U256::from(0x3b9aca00u64)), "0x3b9aca00");
        assert_eq!(format_bytes(&[]), "0x");
        assert_eq!(format_bytes(&[0xde, 0xad]), "0xdead");
    }

    #[test]
    fn test_parse_bytes() {
        assert!(parse_bytes("0x").unwrap().is_empty());
        assert_eq!(parse_bytes("0xdead").unwrap().as_ref(), &[0xde, 0xad]);
        assert!(parse_bytes("0xabc").is_err());
    }
}
