//! Type-safe price representation using decimal arithmetic.
//!
//! The commerce backend computes every amount (unit prices, totals, tax,
//! discounts). The storefront never does arithmetic on them; it only formats
//! them for display, which is why `Price` exposes `display()` and nothing else.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyCodeError {
    /// The code is not exactly three ASCII letters.
    #[error("currency code must be three ASCII letters, got {0:?}")]
    Invalid(String),
}

/// ISO 4217 currency code, normalized to uppercase.
///
/// The backend reports currency codes in lowercase (`"eur"`); both spellings
/// parse to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyCodeError> {
        let trimmed = s.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyCodeError::Invalid(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The uppercase ISO code, e.g. `"USD"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display symbol for common currencies.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" | "CAD" | "AUD" | "NZD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "INR" => Some("₹"),
            _ => None,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("USD".to_string())
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A price with currency information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display: `$19.99`, `-€5.00`, or `12.50 SEK` when the
    /// currency has no well-known symbol.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.amount.round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let magnitude = rounded.abs();

        match self.currency_code.symbol() {
            Some(symbol) => format!("{sign}{symbol}{magnitude:.2}"),
            None => format!("{sign}{magnitude:.2} {}", self.currency_code),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(amount: &str, currency: &str) -> Price {
        Price::new(
            amount.parse::<Decimal>().unwrap(),
            CurrencyCode::parse(currency).unwrap(),
        )
    }

    #[test]
    fn test_currency_code_normalizes_case() {
        let code = CurrencyCode::parse("eur").unwrap();
        assert_eq!(code.as_str(), "EUR");
        assert_eq!(code, CurrencyCode::parse("EUR").unwrap());
    }

    #[test]
    fn test_currency_code_rejects_invalid() {
        assert!(CurrencyCode::parse("").is_err());
        assert!(CurrencyCode::parse("EURO").is_err());
        assert!(CurrencyCode::parse("E1R").is_err());
    }

    #[test]
    fn test_currency_code_deserializes_lowercase() {
        let code: CurrencyCode = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(code.as_str(), "USD");
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }

    #[test]
    fn test_display_with_symbol() {
        assert_eq!(price("19.99", "usd").display(), "$19.99");
        assert_eq!(price("5", "eur").display(), "€5.00");
        assert_eq!(price("1234.5", "gbp").display(), "£1234.50");
    }

    #[test]
    fn test_display_rounds_to_cents() {
        assert_eq!(price("10.005", "usd").display(), "$10.00");
        assert_eq!(price("10.499", "usd").display(), "$10.50");
    }

    #[test]
    fn test_display_negative_amount() {
        assert_eq!(price("-3", "usd").display(), "-$3.00");
        assert_eq!(price("-0.001", "usd").display(), "$0.00");
    }

    #[test]
    fn test_display_without_symbol() {
        assert_eq!(price("12.5", "sek").display(), "12.50 SEK");
    }
}
