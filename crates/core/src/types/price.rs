//! Type-safe price representation using decimal arithmetic.
//!
//! All catalog prices are quoted in Naira per kilogram. The remote API sends
//! and expects plain JSON numbers, so prices (de)serialize as floats.

use std::fmt;
use std::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency symbol used for display.
pub const NAIRA_SYMBOL: &str = "₦";

/// Errors constructing a price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// Input could not be parsed as a decimal amount.
    #[error("invalid price '{0}'")]
    Invalid(String),
}

/// A non-negative amount in Naira.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero Naira.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from whole Naira.
    #[must_use]
    pub fn from_naira(naira: u64) -> Self {
        Self(Decimal::from(naira))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format as a per-kilogram catalog price (e.g., "₦1200/kg").
    #[must_use]
    pub fn per_kg(&self) -> String {
        format!("{self}/kg")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NAIRA_SYMBOL}{}", self.0.normalize())
    }
}

impl std::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s
            .trim()
            .trim_start_matches(NAIRA_SYMBOL)
            .parse::<Decimal>()
            .map_err(|_| PriceError::Invalid(s.to_string()))?;
        Self::new(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let result = Price::new(Decimal::new(-1, 0));
        assert!(matches!(result, Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_display_per_kg() {
        let price = Price::from_naira(1200);
        assert_eq!(price.to_string(), "₦1200");
        assert_eq!(price.per_kg(), "₦1200/kg");
    }

    #[test]
    fn test_parse_with_symbol() {
        let price: Price = "₦450.50".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(45050, 2));
        assert!("abc".parse::<Price>().is_err());
        assert!("-3".parse::<Price>().is_err());
    }

    #[test]
    fn test_subtotal_arithmetic() {
        let total: Price = [Price::from_naira(100) * 3, Price::from_naira(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_naira(350));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_naira(75)).unwrap();
        assert_eq!(json, "75.0");
        let back: Price = serde_json::from_str("12.5").unwrap();
        assert_eq!(back.amount(), Decimal::new(125, 1));
    }
}
