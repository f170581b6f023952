//! Newtype IDs for type-safe entity references.
//!
//! The commerce backend identifies every entity with an opaque, prefixed
//! string (`prod_01H...`, `cart_01H...`). Use the `define_id!` macro to create
//! wrappers that prevent accidentally passing a line item ID where a cart ID
//! is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use harbor_core::define_id;
/// define_id!(WishlistId);
/// define_id!(ReviewId);
///
/// let wishlist_id = WishlistId::new("wl_01");
/// let review_id = ReviewId::new("rev_01");
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = review_id;
/// assert_eq!(wishlist_id.as_str(), "wl_01");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(VariantId);
define_id!(CollectionId);
define_id!(CategoryId);
define_id!(RegionId);
define_id!(CartId);
define_id!(LineItemId);
define_id!(CustomerId);
define_id!(AddressId);
define_id!(OrderId);
define_id!(ShippingOptionId);
define_id!(PaymentProviderId);
define_id!(PaymentCollectionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = CartId::new("cart_01HXYZ");
        assert_eq!(id.as_str(), "cart_01HXYZ");
        assert_eq!(id.to_string(), "cart_01HXYZ");
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = VariantId::from("variant_123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"variant_123\"");

        let parsed: VariantId = serde_json::from_str("\"variant_123\"").unwrap();
        assert_eq!(parsed, id);
    }
}
