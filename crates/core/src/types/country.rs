//! ISO 3166-1 alpha-2 country code.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CountryCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryCodeError {
    /// The code is not exactly two ASCII letters.
    #[error("country code must be two ASCII letters, got {0:?}")]
    Invalid(String),
}

/// A two-letter country code, normalized to lowercase.
///
/// The storefront keys its region context on this value: the visitor picks a
/// country and the backend region containing that country decides currency,
/// prices, shipping options and payment providers.
///
/// ```
/// use harbor_core::CountryCode;
///
/// assert_eq!(CountryCode::parse("DK").unwrap().as_str(), "dk");
/// assert!(CountryCode::parse("dnk").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a country code.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is two ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CountryCodeError> {
        let trimmed = s.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError::Invalid(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// The lowercase code, e.g. `"us"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `other` names the same country, ignoring case.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CountryCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(CountryCode::parse(" US ").unwrap().as_str(), "us");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(CountryCode::parse("").is_err());
        assert!(CountryCode::parse("u").is_err());
        assert!(CountryCode::parse("u1").is_err());
        assert!(CountryCode::parse("usa").is_err());
    }

    #[test]
    fn test_matches_ignores_case() {
        let code = CountryCode::parse("de").unwrap();
        assert!(code.matches("DE"));
        assert!(!code.matches("dk"));
    }

    #[test]
    fn test_serde_validates() {
        let code: CountryCode = serde_json::from_str("\"GB\"").unwrap();
        assert_eq!(code.as_str(), "gb");
        assert!(serde_json::from_str::<CountryCode>("\"GBR\"").is_err());
    }
}
