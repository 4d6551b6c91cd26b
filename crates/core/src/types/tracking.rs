//! Shipment tracking number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`TrackingNumber`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingNumberError {
    /// The input is empty.
    #[error("tracking number cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("tracking number must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A carrier tracking number attached to a shipped order.
///
/// Carriers disagree on format, so validation is intentionally loose:
/// non-empty after trimming, bounded length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Maximum length of a tracking number.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `TrackingNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than 64
    /// characters.
    pub fn parse(s: &str) -> Result<Self, TrackingNumberError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(TrackingNumberError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(TrackingNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the tracking number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TrackingNumber {
    type Err = TrackingNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TrackingNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(TrackingNumber::parse(" TRK123 ").unwrap().as_str(), "TRK123");
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            TrackingNumber::parse("   "),
            Err(TrackingNumberError::Empty)
        ));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "x".repeat(65);
        assert!(matches!(
            TrackingNumber::parse(&long),
            Err(TrackingNumberError::TooLong { .. })
        ));
    }
}
