//! Decimal unit conversion.
//!
//! Amounts travel as integers in base units (wei for ether, the token's
//! smallest unit for ERC-20). These helpers convert between that and the
//! human decimal form without ever going through floating point.

use std::fmt;

use keel_primitives::U256;

use crate::SdkError;

/// Decimals of ether
pub const ETHER_DECIMALS: u8 = 18;

// 10^77 is the largest power of ten that fits in 256 bits
const MAX_DECIMALS: u8 = 77;

/// Parse a decimal string such as `"0.02"` into base units.
///
/// Rejects signs, empty input, more than one `.`, non-digits, more
/// fractional digits than `decimals`, and values above `U256::MAX`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, SdkError> {
    if decimals > MAX_DECIMALS {
        return Err(SdkError::Validation(format!(
            "decimals {} exceeds {}",
            decimals, MAX_DECIMALS
        )));
    }

    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(SdkError::Validation(format!("invalid amount: {:?}", amount)));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(SdkError::Validation(format!("invalid amount: {:?}", amount)));
    }
    if frac_part.len() > decimals as usize {
        return Err(SdkError::Validation(format!(
            "amount {} has more than {} fractional digits",
            amount, decimals
        )));
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..decimals as usize {
        digits.push('0');
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }

    U256::from_dec_str(digits)
        .map_err(|_| SdkError::Validation(format!("amount {} overflows 256 bits", amount)))
}

/// Parse an ether amount into wei
pub fn parse_ether(amount: &str) -> Result<U256, SdkError> {
    parse_units(amount, ETHER_DECIMALS)
}

/// Format base units as an exact decimal string
pub fn format_units(raw: U256, decimals: u8) -> String {
    UnitAmount::new(raw, decimals).to_string()
}

/// An integer amount of base units together with its decimals.
///
/// `Display` is exact: the fractional part keeps every significant digit
/// and at least one, so 5_000_000 with 6 decimals shows as `5.0` and
/// 20_000_000_000_000_000 with 18 decimals as `0.02`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitAmount {
    raw: U256,
    decimals: u8,
}

impl UnitAmount {
    /// Wrap a raw amount
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Wrap a wei amount
    pub fn ether(raw: U256) -> Self {
        Self::new(raw, ETHER_DECIMALS)
    }

    /// Amount in base units
    pub fn raw(&self) -> U256 {
        self.raw
    }

    /// Number of decimals
    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl fmt::Display for UnitAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.raw.to_string();
        let decimals = self.decimals as usize;

        let (int_part, frac_part) = if digits.len() > decimals {
            let (i, f) = digits.split_at(digits.len() - decimals);
            (i.to_string(), f.to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
        };

        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            write!(f, "{}.0", int_part)
        } else {
            write!(f, "{}.{}", int_part, frac_part)
        }
    }
}
