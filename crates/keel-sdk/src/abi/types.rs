//! ABI type definitions

use std::fmt;

use keel_primitives::{Address, H256, U256};

/// Solidity ABI token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer (8-256 bits)
    Int(I256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
    /// Tuple (struct)
    Tuple(Vec<Token>),
}

/// Signed 256-bit integer as sign and magnitude
///
/// Zero is always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I256 {
    abs: U256,
    negative: bool,
}

impl I256 {
    /// Create from magnitude and sign
    pub fn new(abs: U256, negative: bool) -> Self {
        Self {
            abs,
            negative: negative && !abs.is_zero(),
        }
    }

    /// Create from i128
    pub fn from_i128(value: i128) -> Self {
        Self::new(U256::from(value.unsigned_abs()), value < 0)
    }

    /// Magnitude
    pub fn abs(&self) -> U256 {
        self.abs
    }

    /// True if below zero
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }

    /// Two's complement 256-bit representation
    pub fn to_twos_complement(&self) -> U256 {
        if self.negative {
            (!self.abs).overflowing_add(U256::one()).0
        } else {
            self.abs
        }
    }

    /// Read a two's complement 256-bit word
    pub fn from_twos_complement(word: U256) -> Self {
        if word.bit(255) {
            Self::new((!word).overflowing_add(U256::one()).0, true)
        } else {
            Self::new(word, false)
        }
    }

    /// Whether the value fits in a signed integer of `bits` width
    pub fn fits(&self, bits: usize) -> bool {
        if bits == 0 {
            return false;
        }
        let limit = U256::one() << (bits.min(256) - 1);
        if self.negative {
            self.abs <= limit
        } else {
            self.abs < limit
        }
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.abs)
        } else {
            write!(f, "{}", self.abs)
        }
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Dynamic array
    Array(Box<ParamType>),
    /// Fixed-size array
    FixedArray(Box<ParamType>, usize),
    /// Tuple
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing encoding.
    ///
    /// `None` when the size does not fit in `usize`.
    pub(crate) fn head_len(&self) -> Option<usize> {
        if self.is_dynamic() {
            return Some(32);
        }
        match self {
            ParamType::FixedArray(inner, size) => inner.head_len()?.checked_mul(*size),
            ParamType::Tuple(types) => types
                .iter()
                .try_fold(0usize, |total, t| total.checked_add(t.head_len()?)),
            _ => Some(32),
        }
    }
}

/// Canonical type name as used in signatures, e.g. `uint256[2]` or `(address,bytes)`
impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{}", size),
            ParamType::String => write!(f, "string"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
            ParamType::FixedArray(inner, size) => write!(f, "{}[{}]", inner, size),
            ParamType::Tuple(types) => {
                write!(f, "(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Token {
    /// Create an address token
    pub fn address(addr: Address) -> Self {
        Token::Address(addr)
    }

    /// Create a uint256 token
    pub fn uint256(value: U256) -> Self {
        Token::Uint(value)
    }

    /// Create a uint256 from u128
    pub fn uint256_from_u128(value: u128) -> Self {
        Token::Uint(U256::from(value))
    }

    /// Create a bool token
    pub fn bool(value: bool) -> Self {
        Token::Bool(value)
    }

    /// Create a bytes token
    pub fn bytes(data: Vec<u8>) -> Self {
        Token::Bytes(data)
    }

    /// Create a string token
    pub fn string(s: impl Into<String>) -> Self {
        Token::String(s.into())
    }

    /// Create a bytes32 token
    pub fn bytes32(data: H256) -> Self {
        Token::FixedBytes(data.as_bytes().to_vec())
    }

    /// Short kind name for error messages
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Token::Address(_) => "address",
            Token::Uint(_) => "uint",
            Token::Int(_) => "int",
            Token::Bool(_) => "bool",
            Token::Bytes(_) => "bytes",
            Token::FixedBytes(_) => "fixed bytes",
            Token::String(_) => "string",
            Token::Array(_) => "array",
            Token::FixedArray(_) => "fixed array",
            Token::Tuple(_) => "tuple",
        }
    }

    /// Unsigned value, if this is a `Uint`
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Address, if this is an `Address`
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// Boolean, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String slice, if this is a `String`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}
