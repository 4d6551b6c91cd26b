//! Externally visible order number type.

use core::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The externally visible identifier of a committed order.
///
/// Format: `<prefix><YYYYMMDDHHMMSSmmm><3 random digits>`, e.g.
/// `DF20250803142501042317`. The millisecond timestamp makes numbers
/// roughly sortable and human-datable; the random suffix separates orders
/// placed within the same millisecond. Suffix collisions are still
/// possible, so callers that persist order numbers must detect duplicates
/// and regenerate rather than fail.
///
/// Order numbers are never reused, even after cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate an order number for the given instant.
    ///
    /// The caller supplies the RNG so tests can seed it.
    pub fn generate<R: Rng + ?Sized>(prefix: &str, at: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: u32 = rng.random_range(0..1000);
        Self(format!("{prefix}{}{suffix:03}", at.format("%Y%m%d%H%M%S%3f")))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2025, 8, 3, 14, 25, 1).unwrap();
        let mut rng = rand::rng();
        let no = OrderNumber::generate("DF", at, &mut rng);

        assert!(no.as_str().starts_with("DF20250803142501000"));
        assert_eq!(no.as_str().len(), 2 + 17 + 3);
    }

    #[test]
    fn test_suffix_is_zero_padded() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut rng = rand::rng();
        for _ in 0..100 {
            let no = OrderNumber::generate("DF", at, &mut rng);
            assert_eq!(no.as_str().len(), 22);
        }
    }
}
