//! Cart and checkout operations. Nothing here is cached.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use harbor_core::{CartId, LineItemId, PaymentProviderId, RegionId, ShippingOptionId, VariantId};

use super::StoreClient;
use crate::commerce::CommerceError;
use crate::commerce::types::{
    Cart, CartCompletion, CompletionError, CreateCartInput, Order, PaymentCollection,
    PaymentProvider, ShippingOption, UpdateCartInput,
};

#[derive(Deserialize)]
struct CartResponse {
    cart: Cart,
}

#[derive(Deserialize)]
struct LineItemDeleteResponse {
    parent: Cart,
}

#[derive(Deserialize)]
struct ShippingOptionsResponse {
    shipping_options: Vec<ShippingOption>,
}

#[derive(Deserialize)]
struct ShippingOptionResponse {
    shipping_option: ShippingOption,
}

#[derive(Deserialize)]
struct PaymentProvidersResponse {
    payment_providers: Vec<PaymentProvider>,
}

#[derive(Deserialize)]
struct PaymentCollectionResponse {
    payment_collection: PaymentCollection,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CompleteCartResponse {
    Order {
        order: Box<Order>,
    },
    Cart {
        cart: Box<Cart>,
        #[serde(default)]
        error: Option<CompletionError>,
    },
}

impl StoreClient {
    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Create a cart in a region, owned by the customer when a token is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(region_id = %region_id))]
    pub async fn create_cart(
        &self,
        region_id: &RegionId,
        token: Option<&str>,
    ) -> Result<Cart, CommerceError> {
        let input = CreateCartInput {
            region_id: region_id.clone(),
            email: None,
        };
        let response: CartResponse = self.post("/store/carts", &input, token).await?;
        info!(cart_id = %response.cart.id, "Cart created");
        Ok(response.cart)
    }

    /// Get a cart by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the backend no longer knows the cart, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn retrieve_cart(&self, cart_id: &CartId) -> Result<Cart, CommerceError> {
        let response: CartResponse = self
            .get(&format!("/store/carts/{cart_id}"), &[], None)
            .await?;
        Ok(response.cart)
    }

    /// Update email, addresses or region of a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, input), fields(cart_id = %cart_id))]
    pub async fn update_cart(
        &self,
        cart_id: &CartId,
        input: &UpdateCartInput,
    ) -> Result<Cart, CommerceError> {
        let response: CartResponse = self
            .post(&format!("/store/carts/{cart_id}"), input, None)
            .await?;
        Ok(response.cart)
    }

    /// Add a variant to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the line item (e.g., out of stock).
    #[instrument(skip(self), fields(cart_id = %cart_id, variant_id = %variant_id))]
    pub async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, CommerceError> {
        let body = json!({ "variant_id": variant_id, "quantity": quantity });
        let response: CartResponse = self
            .post(&format!("/store/carts/{cart_id}/line-items"), &body, None)
            .await?;
        Ok(response.cart)
    }

    /// Change the quantity of a line item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the quantity.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, CommerceError> {
        let body = json!({ "quantity": quantity });
        let response: CartResponse = self
            .post(
                &format!("/store/carts/{cart_id}/line-items/{line_id}"),
                &body,
                None,
            )
            .await?;
        Ok(response.cart)
    }

    /// Remove a line item and return the updated cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_id: &LineItemId,
    ) -> Result<Cart, CommerceError> {
        let response: LineItemDeleteResponse = self
            .delete(
                &format!("/store/carts/{cart_id}/line-items/{line_id}"),
                None,
                None,
            )
            .await?;
        Ok(response.parent)
    }

    /// Apply promotion codes.
    ///
    /// # Errors
    ///
    /// Returns an error if a code is invalid or the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn apply_promotions(
        &self,
        cart_id: &CartId,
        codes: &[String],
    ) -> Result<Cart, CommerceError> {
        let body = json!({ "promo_codes": codes });
        let response: CartResponse = self
            .post(&format!("/store/carts/{cart_id}/promotions"), &body, None)
            .await?;
        Ok(response.cart)
    }

    /// Remove promotion codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn remove_promotions(
        &self,
        cart_id: &CartId,
        codes: &[String],
    ) -> Result<Cart, CommerceError> {
        let body = json!({ "promo_codes": codes });
        let response: CartResponse = self
            .delete(
                &format!("/store/carts/{cart_id}/promotions"),
                Some(&body),
                None,
            )
            .await?;
        Ok(response.cart)
    }

    /// Assign a guest cart to the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the API request fails.
    #[instrument(skip(self, token), fields(cart_id = %cart_id))]
    pub async fn transfer_cart(&self, cart_id: &CartId, token: &str) -> Result<Cart, CommerceError> {
        let response: CartResponse = self
            .post(
                &format!("/store/carts/{cart_id}/customer"),
                &json!({}),
                Some(token),
            )
            .await?;
        Ok(response.cart)
    }

    // =========================================================================
    // Checkout Methods
    // =========================================================================

    /// Shipping options available for a cart's address and items.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, CommerceError> {
        let response: ShippingOptionsResponse = self
            .get(
                "/store/shipping-options",
                &[("cart_id", cart_id.to_string())],
                None,
            )
            .await?;
        Ok(response.shipping_options)
    }

    /// Price a calculated shipping option for a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot price the option.
    #[instrument(skip(self), fields(option_id = %option_id, cart_id = %cart_id))]
    pub async fn calculate_shipping_option(
        &self,
        option_id: &ShippingOptionId,
        cart_id: &CartId,
    ) -> Result<ShippingOption, CommerceError> {
        let body = json!({ "cart_id": cart_id });
        let response: ShippingOptionResponse = self
            .post(
                &format!("/store/shipping-options/{option_id}/calculate"),
                &body,
                None,
            )
            .await?;
        Ok(response.shipping_option)
    }

    /// Select a shipping option for a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is not valid for the cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, option_id = %option_id))]
    pub async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, CommerceError> {
        let body = json!({ "option_id": option_id });
        let response: CartResponse = self
            .post(
                &format!("/store/carts/{cart_id}/shipping-methods"),
                &body,
                None,
            )
            .await?;
        Ok(response.cart)
    }

    /// Payment providers enabled in a region.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(region_id = %region_id))]
    pub async fn list_payment_providers(
        &self,
        region_id: &RegionId,
    ) -> Result<Vec<PaymentProvider>, CommerceError> {
        let response: PaymentProvidersResponse = self
            .get(
                "/store/payment-providers",
                &[("region_id", region_id.to_string())],
                None,
            )
            .await?;
        Ok(response
            .payment_providers
            .into_iter()
            .filter(|p| p.is_enabled)
            .collect())
    }

    /// Start a payment session with a provider.
    ///
    /// Creates the cart's payment collection first when it has none, then
    /// returns the refreshed cart.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the backend calls fail.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id, provider_id = %provider_id))]
    pub async fn initiate_payment_session(
        &self,
        cart: &Cart,
        provider_id: &PaymentProviderId,
    ) -> Result<Cart, CommerceError> {
        let collection_id = match &cart.payment_collection {
            Some(collection) => collection.id.clone(),
            None => {
                let body = json!({ "cart_id": cart.id });
                let response: PaymentCollectionResponse =
                    self.post("/store/payment-collections", &body, None).await?;
                response.payment_collection.id
            }
        };

        let body = json!({ "provider_id": provider_id });
        let response: PaymentCollectionResponse = self
            .post(
                &format!("/store/payment-collections/{collection_id}/payment-sessions"),
                &body,
                None,
            )
            .await?;
        debug!(
            payment_collection_id = %response.payment_collection.id,
            "Payment session initiated"
        );

        self.retrieve_cart(&cart.id).await
    }

    /// Place the order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. A cart the backend refuses
    /// to complete is `Ok(CartCompletion::Cart { .. })`, not an error.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn complete_cart(&self, cart_id: &CartId) -> Result<CartCompletion, CommerceError> {
        let response: CompleteCartResponse = self
            .post(&format!("/store/carts/{cart_id}/complete"), &json!({}), None)
            .await?;

        Ok(match response {
            CompleteCartResponse::Order { order } => {
                info!(order_id = %order.id, "Cart completed");
                CartCompletion::Order(order)
            }
            CompleteCartResponse::Cart { cart, error } => {
                let error = error
                    .map(|e| e.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Payment could not be completed".to_string());
                tracing::warn!(error = %error, "Cart completion returned a cart");
                CartCompletion::Cart { cart, error }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::Path;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::super::tests::client_for;
    use super::*;

    fn cart_json(id: &str, quantity: u32) -> Value {
        json!({
            "id": id,
            "currency_code": "usd",
            "region_id": "reg_us",
            "items": [{"id": "item_1", "title": "Tee", "quantity": quantity, "unit_price": 20}],
            "total": 20 * quantity
        })
    }

    #[tokio::test]
    async fn test_delete_line_item_returns_parent_cart() {
        let router = Router::new().route(
            "/store/carts/{id}/line-items/{line}",
            delete(|Path((id, _line)): Path<(String, String)>| async move {
                Json(json!({
                    "id": "item_1",
                    "object": "line-item",
                    "deleted": true,
                    "parent": {"id": id, "currency_code": "usd", "items": []}
                }))
            }),
        );
        let client = client_for(router).await;

        let cart = client
            .delete_line_item(&CartId::new("cart_1"), &LineItemId::new("item_1"))
            .await
            .unwrap();
        assert_eq!(cart.id.as_str(), "cart_1");
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_line_item_posts_variant_and_quantity() {
        let seen = Arc::new(Mutex::new(None::<Value>));
        let recorder = Arc::clone(&seen);
        let router = Router::new().route(
            "/store/carts/{id}/line-items",
            post(move |Path(id): Path<String>, Json(body): Json<Value>| {
                let recorder = Arc::clone(&recorder);
                async move {
                    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or(0)).unwrap();
                    *recorder.lock().unwrap() = Some(body);
                    Json(json!({ "cart": cart_json(&id, quantity) }))
                }
            }),
        );
        let client = client_for(router).await;

        let cart = client
            .add_line_item(&CartId::new("cart_1"), &VariantId::new("variant_1"), 3)
            .await
            .unwrap();

        assert_eq!(cart.item_count(), 3);
        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["variant_id"], "variant_1");
        assert_eq!(body["quantity"], 3);
    }

    #[tokio::test]
    async fn test_complete_cart_returns_order() {
        let router = Router::new().route(
            "/store/carts/{id}/complete",
            post(|| async {
                Json(json!({
                    "type": "order",
                    "order": {"id": "order_1", "display_id": 7, "currency_code": "usd"}
                }))
            }),
        );
        let client = client_for(router).await;

        match client.complete_cart(&CartId::new("cart_1")).await.unwrap() {
            CartCompletion::Order(order) => assert_eq!(order.number(), "#7"),
            CartCompletion::Cart { error, .. } => panic!("expected order, got cart: {error}"),
        }
    }

    #[tokio::test]
    async fn test_complete_cart_returns_cart_with_error() {
        let router = Router::new().route(
            "/store/carts/{id}/complete",
            post(|Path(id): Path<String>| async move {
                Json(json!({
                    "type": "cart",
                    "cart": cart_json(&id, 1),
                    "error": {"message": "Payment authorization failed", "name": "Error"}
                }))
            }),
        );
        let client = client_for(router).await;

        match client.complete_cart(&CartId::new("cart_1")).await.unwrap() {
            CartCompletion::Cart { cart, error } => {
                assert_eq!(cart.id.as_str(), "cart_1");
                assert_eq!(error, "Payment authorization failed");
            }
            CartCompletion::Order(_) => panic!("expected cart"),
        }
    }

    #[tokio::test]
    async fn test_initiate_payment_creates_collection_when_missing() {
        let calls = Arc::new(Mutex::new(Vec::<String>::new()));
        let log_collection = Arc::clone(&calls);
        let log_session = Arc::clone(&calls);
        let router = Router::new()
            .route(
                "/store/payment-collections",
                post(move || {
                    let log = Arc::clone(&log_collection);
                    async move {
                        log.lock().unwrap().push("collection".to_string());
                        Json(json!({"payment_collection": {"id": "paycol_1"}}))
                    }
                }),
            )
            .route(
                "/store/payment-collections/{id}/payment-sessions",
                post(move |Path(id): Path<String>| {
                    let log = Arc::clone(&log_session);
                    async move {
                        log.lock().unwrap().push(format!("session:{id}"));
                        Json(json!({"payment_collection": {"id": id}}))
                    }
                }),
            )
            .route(
                "/store/carts/{id}",
                get(|Path(id): Path<String>| async move {
                    let mut cart = cart_json(&id, 1);
                    cart["payment_collection"] = json!({
                        "id": "paycol_1",
                        "payment_sessions": [
                            {"id": "ps_1", "provider_id": "pp_system_default", "status": "pending"}
                        ]
                    });
                    Json(json!({ "cart": cart }))
                }),
            );
        let client = client_for(router).await;
        let cart: Cart = serde_json::from_value(cart_json("cart_1", 1)).unwrap();

        let cart = client
            .initiate_payment_session(&cart, &PaymentProviderId::new("pp_system_default"))
            .await
            .unwrap();

        assert!(cart.active_payment_session().is_some());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["collection".to_string(), "session:paycol_1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stale_cart_is_not_found() {
        let router = Router::new().route(
            "/store/carts/{id}",
            get(|| async {
                (
                    axum::http::StatusCode::NOT_FOUND,
                    Json(json!({"type": "not_found", "message": "Cart id not found"})),
                )
            }),
        );
        let client = client_for(router).await;

        let err = client.retrieve_cart(&CartId::new("cart_gone")).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound(_)));
    }
}
