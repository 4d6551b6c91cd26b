//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative monetary amount.
///
/// The shop trades in a single currency (multi-currency pricing is out of
/// scope), so a `Price` is just a decimal amount in the currency's standard
/// unit. All arithmetic is checked; overflow returns `None` rather than
/// wrapping.
///
/// ## Examples
///
/// ```
/// use dragonfruit_core::Price;
/// use rust_decimal::Decimal;
///
/// let base = Price::from_major(100);
/// let option = Price::from_major(20);
/// let unit = base.checked_add(option).unwrap();
/// assert_eq!(unit.times(2).unwrap(), Price::from_major(240));
/// assert!(Price::new(Decimal::from(-1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of currency units.
    #[must_use]
    pub fn from_major(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checked addition.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked multiplication by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::new(Decimal::from(-5)), Err(PriceError::Negative));
    }

    #[test]
    fn test_zero_is_valid() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_arithmetic() {
        let unit = Price::from_major(100)
            .checked_add(Price::from_major(20))
            .unwrap();
        assert_eq!(unit.times(2).unwrap(), Price::from_major(240));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_major(120).to_string(), "$120");
    }
}
