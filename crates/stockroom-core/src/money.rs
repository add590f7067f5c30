//! # Money
//!
//! Prices are whole cents in an `i64`, end to end:
//!
//! ```text
//!   form "1,250.5" ──parse──► Money(125050) ──bind──► INTEGER column
//!                                  │
//!                                  └──Display──► "1250.50"  (server adds "$")
//! ```
//!
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let unit = Money::parse("10.99").unwrap();
//! assert_eq!((unit * 2).cents(), 2198);
//! assert_eq!(unit.to_string(), "10.99");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};
use std::str::FromStr;
use thiserror::Error;

/// An amount in cents. Serializes as the bare integer.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `None` on overflow.
    pub const fn checked_add(self, rhs: Money) -> Option<Money> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Unit price times quantity, `None` on overflow.
    pub const fn checked_mul(self, quantity: i64) -> Option<Money> {
        match self.0.checked_mul(quantity) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Reads an amount typed into a form.
    ///
    /// Accepts an optional leading `-`, thousands commas, and up to two
    /// decimals (`"100"`, `"100.5"`, `".5"`, `"12."`, `"1,250.00"`). Blank
    /// input is an error; callers that allow blank check first.
    ///
    /// ```rust
    /// use stockroom_core::money::{Money, ParseMoneyError};
    ///
    /// assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::parse("1.005"), Err(ParseMoneyError::TooPrecise));
    /// ```
    pub fn parse(input: &str) -> Result<Money, ParseMoneyError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ParseMoneyError::Empty);
        }

        let (sign, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, text),
        };
        let digits = unsigned.replace(',', "");
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(ParseMoneyError::InvalidDigits);
        }
        if fraction.len() > 2 {
            return Err(ParseMoneyError::TooPrecise);
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseMoneyError::Overflow)?
        };
        // "5" means 50 cents, "05" means 5.
        let fraction = format!("{fraction:0<2}");
        let fraction: i64 = fraction.parse().map_err(|_| ParseMoneyError::InvalidDigits)?;

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .map(|c| Money(sign * c))
            .ok_or(ParseMoneyError::Overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoneyError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must be a decimal number")]
    InvalidDigits,

    #[error("amount can have at most 2 decimal places")]
    TooPrecise,

    #[error("amount is too large")]
    Overflow,
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

/// Two decimals, no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Saturates at the `i64` bounds. Totals that are persisted go through
/// [`Money::checked_add`] instead.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

/// Unit price times quantity, saturating like `Add`.
impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, quantity: i64) -> Money {
        Money(self.0.saturating_mul(quantity))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::default().to_string(), "0.00");
    }

    #[test]
    fn test_line_totals() {
        let total: Money = [(10_000, 2), (500, 1), (1, 0)]
            .into_iter()
            .map(|(price, qty)| Money::from_cents(price) * qty)
            .sum();
        assert_eq!(total.cents(), 20_500);

        let empty: Money = std::iter::empty::<Money>().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_overflow_is_caught_or_saturated() {
        let big = Money::from_cents(92_233_720_368_547_758);

        assert_eq!(big.checked_mul(2), None);
        assert_eq!(big.checked_add(Money::from_cents(i64::MAX)), None);
        assert_eq!(Money::from_cents(250).checked_mul(4), Some(Money::from_cents(1000)));

        assert_eq!((big * 2).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MAX) + big).cents(), i64::MAX);
    }

    #[test]
    fn test_parse_accepts_form_input() {
        assert_eq!(Money::parse("100").unwrap().cents(), 10000);
        assert_eq!(Money::parse(" 100.5 ").unwrap().cents(), 10050);
        assert_eq!(Money::parse("100.05").unwrap().cents(), 10005);
        assert_eq!(Money::parse(".5").unwrap().cents(), 50);
        assert_eq!(Money::parse("12.").unwrap().cents(), 1200);
        assert_eq!(Money::parse("1,250.00").unwrap().cents(), 125000);
        assert_eq!("-3".parse::<Money>().unwrap().cents(), -300);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse(""), Err(ParseMoneyError::Empty));
        assert_eq!(Money::parse("   "), Err(ParseMoneyError::Empty));
        assert_eq!(Money::parse("."), Err(ParseMoneyError::InvalidDigits));
        assert_eq!(Money::parse("abc"), Err(ParseMoneyError::InvalidDigits));
        assert_eq!(Money::parse("1.2.3"), Err(ParseMoneyError::InvalidDigits));
        assert_eq!(Money::parse("+1"), Err(ParseMoneyError::InvalidDigits));
        assert_eq!(Money::parse("1.005"), Err(ParseMoneyError::TooPrecise));
        assert_eq!(
            Money::parse("99999999999999999999"),
            Err(ParseMoneyError::Overflow)
        );
    }

    #[test]
    fn test_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "1250");
    }
}
