//! Pickup store code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`StoreCode`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCodeError {
    /// The input is not six digits long.
    #[error("store code must be 6 digits")]
    WrongLength,
    /// The input contains non-digit characters.
    #[error("store code may only contain digits")]
    InvalidCharacter,
}

/// A convenience-store pickup code, collected during checkout.
///
/// Carrier store codes are fixed-length numeric identifiers; this type
/// validates the 6-digit format used by the pickup network the shop ships
/// through.
///
/// ## Examples
///
/// ```
/// use dragonfruit_core::StoreCode;
///
/// assert!(StoreCode::parse("123456").is_ok());
/// assert!(StoreCode::parse("12345").is_err());
/// assert!(StoreCode::parse("12a456").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct StoreCode(String);

impl StoreCode {
    /// Length of a store code.
    pub const LENGTH: usize = 6;

    /// Parse a `StoreCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is not exactly six ASCII
    /// digits.
    pub fn parse(s: &str) -> Result<Self, StoreCodeError> {
        let s = s.trim();

        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(StoreCodeError::InvalidCharacter);
        }

        if s.len() != Self::LENGTH {
            return Err(StoreCodeError::WrongLength);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StoreCode {
    type Err = StoreCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for StoreCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
