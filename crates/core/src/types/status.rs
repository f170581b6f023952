//! Status enums reported by the commerce backend for orders.
//!
//! The backend may add states over time, so every enum carries an `Unknown`
//! variant instead of failing deserialization.

use serde::{Deserialize, Serialize};

/// Overall order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Draft,
    Archived,
    Canceled,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Processing",
            Self::Completed => "Completed",
            Self::Draft => "Draft",
            Self::Archived => "Archived",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
            Self::Unknown => "Unknown",
        }
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Awaiting,
    Authorized,
    PartiallyAuthorized,
    Captured,
    PartiallyCaptured,
    Refunded,
    PartiallyRefunded,
    Canceled,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotPaid => "Not paid",
            Self::Awaiting => "Awaiting payment",
            Self::Authorized => "Authorized",
            Self::PartiallyAuthorized => "Partially authorized",
            Self::Captured => "Paid",
            Self::PartiallyCaptured => "Partially paid",
            Self::Refunded => "Refunded",
            Self::PartiallyRefunded => "Partially refunded",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
            Self::Unknown => "Unknown",
        }
    }
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    NotFulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyShipped,
    Shipped,
    PartiallyDelivered,
    Delivered,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl FulfillmentStatus {
    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotFulfilled => "Not fulfilled",
            Self::PartiallyFulfilled => "Partially fulfilled",
            Self::Fulfilled => "Fulfilled",
            Self::PartiallyShipped => "Partially shipped",
            Self::Shipped => "Shipped",
            Self::PartiallyDelivered => "Partially delivered",
            Self::Delivered => "Delivered",
            Self::Canceled => "Canceled",
            Self::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_status_deserializes() {
        let status: PaymentStatus = serde_json::from_str("\"captured\"").unwrap();
        assert_eq!(status, PaymentStatus::Captured);
        assert_eq!(status.label(), "Paid");
    }

    #[test]
    fn test_unknown_status_falls_back() {
        let status: FulfillmentStatus = serde_json::from_str("\"teleported\"").unwrap();
        assert_eq!(status, FulfillmentStatus::Unknown);

        let status: OrderStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }
}
