//! Customer name type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CustomerName`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerNameError {
    /// The input is shorter than the minimum length.
    #[error("name must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum length.
    #[error("name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters other than letters and spaces.
    #[error("name may only contain letters and spaces")]
    InvalidCharacter,
}

/// A customer's real name, collected during checkout.
///
/// ## Constraints
///
/// - Length: 2-20 characters after trimming surrounding whitespace
/// - Letters (any script) and spaces only; digits and symbols are rejected
///
/// ## Examples
///
/// ```
/// use dragonfruit_core::CustomerName;
///
/// assert!(CustomerName::parse("王小明").is_ok());
/// assert!(CustomerName::parse("Mary Jones").is_ok());
///
/// assert!(CustomerName::parse("A").is_err());      // too short
/// assert!(CustomerName::parse("john99").is_err()); // digits rejected
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CustomerName(String);

impl CustomerName {
    /// Minimum length of a customer name.
    pub const MIN_LENGTH: usize = 2;
    /// Maximum length of a customer name.
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `CustomerName` from a string.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input:
    /// - Has fewer than 2 or more than 20 characters
    /// - Contains anything other than letters and spaces
    pub fn parse(s: &str) -> Result<Self, CustomerNameError> {
        let s = s.trim();
        let len = s.chars().count();

        if len < Self::MIN_LENGTH {
            return Err(CustomerNameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if len > Self::MAX_LENGTH {
            return Err(CustomerNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s.chars().all(|c| c.is_alphabetic() || c == ' ') {
            return Err(CustomerNameError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CustomerName` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CustomerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CustomerName {
    type Err = CustomerNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CustomerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_names() {
        assert!(CustomerName::parse("王小明").is_ok());
        assert!(CustomerName::parse("Mary Jones").is_ok());
        assert!(CustomerName::parse("  李四  ").is_ok());
        assert!(CustomerName::parse("José García").is_ok());
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            CustomerName::parse("A"),
            Err(CustomerNameError::TooShort { .. })
        ));
        assert!(matches!(
            CustomerName::parse("   "),
            Err(CustomerNameError::TooShort { .. })
        ));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(21);
        assert!(matches!(
            CustomerName::parse(&long),
            Err(CustomerNameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_digits_and_symbols() {
        assert!(matches!(
            CustomerName::parse("john99"),
            Err(CustomerNameError::InvalidCharacter)
        ));
        assert!(matches!(
            CustomerName::parse("a_b"),
            Err(CustomerNameError::InvalidCharacter)
        ));
        assert!(matches!(
            CustomerName::parse("王-明"),
            Err(CustomerNameError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_trims_before_validation() {
        let name = CustomerName::parse("  王小明  ").unwrap();
        assert_eq!(name.as_str(), "王小明");
    }
}
