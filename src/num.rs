//! Numeric conversions between raw on-chain fixed-point integers and
//! the decimal domain representation.
//!
//! On-chain amounts are unsigned integers scaled by `10^decimals` of the
//! corresponding token. The UI-facing representation divides first and
//! formats to exactly `decimals` fractional digits, truncating, never
//! rounding up and never falling back to scientific notation.

use alloy::primitives::{I256, U256};
use fastnum::{
    bint,
    decimal::{Context, Decimal, RoundingMode, UnsignedDecimal},
};

/// Fixed-point to decimal converter for one token's scale.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> UnsignedDecimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())
            .expect("Converter: U256 -> UInt::<N>");
        UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }

    pub fn from_signed<const N: usize>(&self, value: I256) -> Decimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.unsigned_abs().as_le_slice())
            .expect("Converter: abs(I256) -> UInt::<N>");
        Decimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            match value.sign() {
                alloy::primitives::Sign::Negative => fastnum::decimal::Sign::Minus,
                alloy::primitives::Sign::Positive => fastnum::decimal::Sign::Plus,
            },
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }

    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> U256 {
        let rescaled = value.rescale(self.decimals as i16);
        U256::from_le_slice(rescaled.digits().to_radix_le(256).as_slice())
    }
}

fn scale_factor(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Renders a raw fixed-point integer as a decimal string with exactly
/// `decimals` fractional digits.
///
/// Division happens on the integer first, then the remainder is
/// zero-padded; `format_fixed(1_000_000_000, 6)` is `"1000.000000"`.
pub fn format_fixed(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let scale = scale_factor(decimals);
    let int = raw / scale;
    let frac = raw % scale;
    format!("{int}.{frac:0>width$}", width = decimals as usize)
}

/// Parses a decimal string back to the raw fixed-point integer,
/// truncating fractional digits beyond `decimals`.
///
/// Inverse of [`format_fixed`] up to that truncation: formatting a raw
/// value and parsing it back reproduces the original exactly.
pub fn parse_fixed(value: &str, decimals: u8) -> Option<U256> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    let int: U256 = int_part.parse().ok()?;
    let mut frac_digits = frac_part
        .chars()
        .take(decimals as usize)
        .collect::<String>();
    while frac_digits.len() < decimals as usize {
        frac_digits.push('0');
    }
    let frac: U256 = if frac_digits.is_empty() {
        U256::ZERO
    } else {
        frac_digits.parse().ok()?
    };
    int.checked_mul(scale_factor(decimals))?.checked_add(frac)
}

#[cfg(test)]
mod tests {
    use fastnum::{dec256, udec256};

    use super::*;

    #[test]
    fn test_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned(U256::from(1234567890)),
            udec256!(1234567890)
        );
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(1234567890)),
            udec256!(1234.56789)
        );
        assert_eq!(
            Converter::new(18).from_unsigned(U256::from(1234567890)),
            udec256!(0.00000000123456789)
        );
    }

    #[test]
    fn test_converter_from_signed() {
        assert_eq!(
            Converter::new(6).from_signed(I256::try_from(1234567890).unwrap()),
            dec256!(1234.56789)
        );
        assert_eq!(
            Converter::new(6).from_signed(I256::try_from(-1234567890).unwrap()),
            dec256!(-1234.56789)
        );
    }

    #[test]
    fn test_converter_round_trip() {
        let conv = Converter::new(18);
        let raw = U256::from(987_654_321_012_345_678u64);
        assert_eq!(conv.to_unsigned(conv.from_unsigned::<4>(raw)), raw);
    }

    #[test]
    fn test_format_fixed_pads_and_truncates() {
        // 1000 units of a 6-decimal token
        assert_eq!(format_fixed(U256::from(1_000_000_000u64), 6), "1000.000000");
        assert_eq!(format_fixed(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_fixed(U256::ZERO, 6), "0.000000");
        assert_eq!(format_fixed(U256::from(42u64), 0), "42");
        // Large 18-decimal value keeps plain notation
        let raw = U256::from(10u64).pow(U256::from(30u64));
        assert_eq!(format_fixed(raw, 18), "1000000000000.000000000000000000");
    }

    #[test]
    fn test_parse_fixed() {
        assert_eq!(
            parse_fixed("1000.000000", 6),
            Some(U256::from(1_000_000_000u64))
        );
        assert_eq!(parse_fixed("1000", 6), Some(U256::from(1_000_000_000u64)));
        assert_eq!(parse_fixed("0.0000019", 6), Some(U256::from(1u64)));
        assert_eq!(parse_fixed("abc", 6), None);
    }

    #[test]
    fn test_format_parse_round_trip() {
        for raw in [0u64, 1, 999_999, 1_000_000, 123_456_789_000] {
            let raw = U256::from(raw);
            assert_eq!(parse_fixed(&format_fixed(raw, 6), 6), Some(raw));
        }
    }
}
