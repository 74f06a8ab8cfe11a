//! Money Normalization Module
//!
//! Unified conversion of every numeric source form into one canonical exact
//! decimal. All currency amounts MUST go through this module before any
//! arithmetic or persistence.
//!
//! ## Design Principles
//! 1. Single canonical type: `rust_decimal::Decimal` (96-bit mantissa,
//!    28-29 significant digits) everywhere downstream
//! 2. No silent precision loss: floats are rendered to their shortest
//!    round-trip text form and re-parsed exactly, never converted from the
//!    binary value
//! 3. Display equals storage: formatting applies the same rounding the
//!    `DECIMAL(15,2)` column applies on write
//!
//! ## Usage
//! ```text
//! let amount = normalize_str("250.75")?;          // text, parsed exactly
//! let amount = normalize_f64(100.5)?;             // float, via "100.5"
//! let amount = normalize_int(500);                // integer, direct
//! assert_eq!(format_amount(amount), "500.00");    // fixed two fraction digits
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// Fraction digits of the backing `DECIMAL(15,2)` columns.
pub const FRACTION_DIGITS: u32 = 2;

#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("amount must be positive")]
    NotPositive,
}

// ============================================================================
// Normalize: source form -> canonical Decimal
// ============================================================================

/// Parse a textual amount directly as an exact decimal.
///
/// Never routed through floating point, so "200.75" is exactly 200.75.
/// Scientific notation, thousands separators, and garbage all fail with
/// [`MoneyError::InvalidFormat`]; callers catch that at the input boundary.
pub fn normalize_str(input: &str) -> Result<Decimal, MoneyError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    Decimal::from_str(input).map_err(|_| MoneyError::InvalidFormat(input.to_string()))
}

/// Convert a binary float by rendering its shortest round-trip text form and
/// parsing that as an exact decimal.
///
/// Going through text avoids importing the float's binary representation
/// error into currency math: `100.5_f64` becomes exactly 100.5.
pub fn normalize_f64(value: f64) -> Result<Decimal, MoneyError> {
    if !value.is_finite() {
        return Err(MoneyError::InvalidFormat(value.to_string()));
    }

    // f64's Display is the canonical shortest form that round-trips
    let text = value.to_string();
    Decimal::from_str(&text).map_err(|_| MoneyError::InvalidFormat(text))
}

/// Convert an integer amount directly.
pub fn normalize_int(value: i64) -> Decimal {
    Decimal::from(value)
}

/// Reject zero and negative amounts.
pub fn require_positive(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive);
    }
    Ok(amount)
}

// ============================================================================
// Quantize / Format: canonical Decimal -> storage scale / display string
// ============================================================================

/// Round to the column scale, midpoint away from zero.
///
/// This is the rounding the `DECIMAL(15,2)` column itself applies on write,
/// so in-memory arithmetic and persisted values never diverge.
pub fn quantize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
}

/// Render any decimal with exactly two fraction digits.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.prec$}", quantize(amount), prec = FRACTION_DIGITS as usize)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn qa_normalize_text_is_exact() {
        assert_eq!(normalize_str("200.75").unwrap(), dec("200.75"));
        assert_eq!(normalize_str("  1000.50 ").unwrap(), dec("1000.50"));
        assert_eq!(normalize_str("0.01").unwrap(), dec("0.01"));
        assert_eq!(normalize_str("-5").unwrap(), dec("-5"));
    }

    #[test]
    fn qa_normalize_text_rejects_garbage() {
        for case in ["", "   ", "abc", "1.2.3", "1e5", "1,000.00", "₹100"] {
            assert!(
                normalize_str(case).is_err(),
                "should reject invalid format: {case:?}"
            );
        }
    }

    #[test]
    fn qa_normalize_float_goes_through_shortest_text() {
        assert_eq!(normalize_f64(100.5).unwrap(), dec("100.5"));
        assert_eq!(normalize_f64(0.1).unwrap(), dec("0.1"));
        assert_eq!(normalize_f64(2675.77).unwrap(), dec("2675.77"));
        assert!(normalize_f64(f64::NAN).is_err());
        assert!(normalize_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn qa_normalize_int_is_direct() {
        assert_eq!(normalize_int(500), dec("500"));
        assert_eq!(normalize_int(-3), dec("-3"));
    }

    #[test]
    fn qa_format_fixed_two_fraction_digits() {
        assert_eq!(format_amount(dec("500")), "500.00");
        assert_eq!(format_amount(dec("749.75")), "749.75");
        assert_eq!(format_amount(dec("751")), "751.00");
        assert_eq!(format_amount(dec("0.1")), "0.10");
    }

    #[test]
    fn qa_format_rounds_midpoint_away_from_zero() {
        // same rule the DECIMAL(15,2) column applies on write
        assert_eq!(format_amount(dec("1.005")), "1.01");
        assert_eq!(format_amount(dec("2.675")), "2.68");
        assert_eq!(format_amount(dec("-1.005")), "-1.01");
        assert_eq!(format_amount(dec("1.004")), "1.00");
    }

    #[test]
    fn qa_roundtrip_representative_inputs() {
        // normalize(format(normalize(x))) == normalize(x) at column scale
        let float_in = normalize_f64(100.5).unwrap();
        let text_in = normalize_str("200.75").unwrap();
        let int_in = normalize_int(500);

        for amount in [float_in, text_in, int_in] {
            let round_tripped = normalize_str(&format_amount(amount)).unwrap();
            assert_eq!(round_tripped, quantize(amount));
        }
    }

    #[test]
    fn qa_require_positive() {
        assert!(require_positive(dec("0.01")).is_ok());
        assert!(matches!(
            require_positive(Decimal::ZERO),
            Err(MoneyError::NotPositive)
        ));
        assert!(matches!(
            require_positive(dec("-1")),
            Err(MoneyError::NotPositive)
        ));
    }

    #[test]
    fn qa_exact_subtraction_no_binary_drift() {
        // 1000.50 - 250.75 must be exactly 749.75, unlike f64 arithmetic
        let a = normalize_str("1000.50").unwrap();
        let b = normalize_str("250.75").unwrap();
        assert_eq!(a - b, dec("749.75"));
        assert_eq!(normalize_str("500.25").unwrap() + b, dec("751.00"));
    }
}
