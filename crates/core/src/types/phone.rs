//! Mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The normalized input is not ten digits long.
    #[error("phone number must be 10 digits")]
    WrongLength,
    /// The normalized input does not start with the local mobile prefix.
    #[error("phone number must start with 09")]
    WrongPrefix,
    /// The normalized input contains non-digit characters.
    #[error("phone number may only contain digits")]
    InvalidCharacter,
}

/// A local mobile phone number, collected during checkout.
///
/// Input is normalized by stripping `-` and space separators before
/// validation, so `0912-345-678` and `0912 345 678` both parse to
/// `0912345678`.
///
/// ## Constraints
///
/// - Exactly 10 ASCII digits after normalization
/// - Must start with the local mobile prefix `09`
///
/// ## Examples
///
/// ```
/// use dragonfruit_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("0912345678").is_ok());
/// assert!(PhoneNumber::parse("0912-345-678").is_ok());
///
/// assert!(PhoneNumber::parse("0212345678").is_err()); // landline prefix
/// assert!(PhoneNumber::parse("09123").is_err());      // too short
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Length of a normalized mobile number.
    pub const LENGTH: usize = 10;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if, after stripping `-` and spaces, the input:
    /// - Contains non-digit characters
    /// - Is not exactly 10 digits
    /// - Does not start with `09`
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != ' ')
            .collect();

        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::InvalidCharacter);
        }

        if normalized.len() != Self::LENGTH {
            return Err(PhoneNumberError::WrongLength);
        }

        if !normalized.starts_with("09") {
            return Err(PhoneNumberError::WrongPrefix);
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PhoneNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_numbers() {
        assert!(PhoneNumber::parse("0912345678").is_ok());
        assert!(PhoneNumber::parse("0987654321").is_ok());
    }

    #[test]
    fn test_normalizes_separators() {
        let phone = PhoneNumber::parse("0912-345-678").unwrap();
        assert_eq!(phone.as_str(), "0912345678");

        let phone = PhoneNumber::parse("0912 345 678").unwrap();
        assert_eq!(phone.as_str(), "0912345678");
    }

    #[test]
    fn test_parse_wrong_prefix() {
        assert!(matches!(
            PhoneNumber::parse("0212345678"),
            Err(PhoneNumberError::WrongPrefix)
        ));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            PhoneNumber::parse("09123"),
            Err(PhoneNumberError::WrongLength)
        ));
        assert!(matches!(
            PhoneNumber::parse("091234567890"),
            Err(PhoneNumberError::WrongLength)
        ));
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert!(matches!(
            PhoneNumber::parse("09abc45678"),
            Err(PhoneNumberError::InvalidCharacter)
        ));
    }
}
