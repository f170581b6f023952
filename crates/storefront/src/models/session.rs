//! Session-related types.
//!
//! Types stored in the session for cart, region and authentication state.

use serde::{Deserialize, Serialize};

use harbor_core::CustomerId;

use crate::commerce::CustomerSession;

/// Session-stored customer identity.
///
/// Holds the bearer token for customer-scoped Store API calls plus enough of
/// the profile to greet the customer without a backend round trip.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Backend customer ID.
    pub id: CustomerId,
    /// Customer email.
    pub email: String,
    /// First name, if the customer gave one.
    pub first_name: Option<String>,
    /// Bearer token for customer-scoped calls.
    pub token: String,
}

impl CurrentCustomer {
    /// Name shown in the header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.first_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => &self.email,
        }
    }
}

impl From<CustomerSession> for CurrentCustomer {
    fn from(session: CustomerSession) -> Self {
        Self {
            id: session.customer.id,
            email: session.customer.email,
            first_name: session.customer.first_name,
            token: session.token,
        }
    }
}

impl std::fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Session keys.
pub mod keys {
    /// Key for the signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the backend cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for the item count of the last returned cart (header badge).
    pub const CART_COUNT: &str = "cart_count";

    /// Key for the selected country code (region context).
    pub const COUNTRY_CODE: &str = "country_code";

    /// Key for notifications waiting to be rendered.
    pub const TOASTS: &str = "toasts";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer(first_name: Option<&str>) -> CurrentCustomer {
        CurrentCustomer {
            id: CustomerId::new("cus_1"),
            email: "ada@example.com".to_string(),
            first_name: first_name.map(str::to_string),
            token: "secret-token".to_string(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(customer(Some("Ada")).display_name(), "Ada");
        assert_eq!(customer(Some("  ")).display_name(), "ada@example.com");
        assert_eq!(customer(None).display_name(), "ada@example.com");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", customer(None));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_session_round_trip() {
        let json = serde_json::to_string(&customer(Some("Ada"))).unwrap();
        let back: CurrentCustomer = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token, "secret-token");
        assert_eq!(back.id.as_str(), "cus_1");
    }
}
