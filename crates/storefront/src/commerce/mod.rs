//! Commerce backend Store API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS via `reqwest`; every request carries the
//!   publishable key in `x-publishable-api-key`
//! - The backend is the source of truth - NO local copies, direct API calls
//! - In-memory caching via `moka` for catalog responses (5 minute TTL by default)
//! - Carts, checkout and customer data are never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use harbor_storefront::commerce::{ProductQuery, StoreClient};
//!
//! let client = StoreClient::new(&config.commerce)?;
//!
//! // Get a product priced for a region
//! let product = client.product_by_handle("linen-shirt", Some(&region.id)).await?;
//!
//! // Create a cart and add items
//! let cart = client.create_cart(&region.id, None).await?;
//! let cart = client.add_line_item(&cart.id, &product.variants[0].id, 1).await?;
//! ```

mod store;
pub mod types;

pub use store::{CustomerSession, StoreClient};
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the Store API.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Store API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend error type (e.g., `invalid_data`, `not_allowed`).
        kind: Option<String>,
        /// Backend error message.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Cart completion did not produce an order.
    #[error("Cart could not be completed: {0}")]
    Incomplete(String),
}

impl CommerceError {
    /// HTTP status the backend answered with, if the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Whether the backend rejected the customer's bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401))
    }

    /// Message safe to show to a shopper.
    ///
    /// Backend validation messages (4xx) are meant for end users; anything
    /// else is replaced with a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api {
                status, message, ..
            } if (400..500).contains(status) && !message.is_empty() => message.clone(),
            Self::Incomplete(message) if !message.is_empty() => message.clone(),
            Self::NotFound(_) => "That item is no longer available.".to_string(),
            Self::RateLimited(_) => "Too many requests, please try again shortly.".to_string(),
            _ => "Something went wrong, please try again.".to_string(),
        }
    }
}

/// Error body returned by the backend on non-success responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Error type (e.g., `not_found`, `invalid_data`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_commerce_error_display() {
        let err = CommerceError::NotFound("product linen-shirt".to_string());
        assert_eq!(err.to_string(), "Not found: product linen-shirt");

        let err = CommerceError::Api {
            status: 400,
            kind: Some("invalid_data".to_string()),
            message: "Quantity must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Store API error (400): Quantity must be positive"
        );
    }

    #[test]
    fn test_status_and_unauthorized() {
        let err = CommerceError::Api {
            status: 401,
            kind: None,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert!(!CommerceError::NotFound(String::new()).is_unauthorized());
        assert_eq!(CommerceError::RateLimited(3).status(), Some(429));
    }

    #[test]
    fn test_user_message_hides_server_errors() {
        let client_err = CommerceError::Api {
            status: 400,
            kind: None,
            message: "The promotion code SUMMER is invalid".to_string(),
        };
        assert_eq!(
            client_err.user_message(),
            "The promotion code SUMMER is invalid"
        );

        let server_err = CommerceError::Api {
            status: 500,
            kind: None,
            message: "database exploded at row 42".to_string(),
        };
        assert_eq!(
            server_err.user_message(),
            "Something went wrong, please try again."
        );
    }

    #[test]
    fn test_api_error_body_parses() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"type":"not_allowed","message":"Cart is completed"}"#)
                .unwrap();
        assert_eq!(body.kind.as_deref(), Some("not_allowed"));
        assert_eq!(body.message, "Cart is completed");

        let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message.is_empty());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = CommerceError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
