//! Customer authentication, profile, address and order operations.
//!
//! Every call except `login`, `register` and `retrieve_order` requires the
//! customer's bearer token.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use harbor_core::{AddressId, OrderId};

use super::StoreClient;
use crate::commerce::CommerceError;
use crate::commerce::types::{
    AddressInput, Customer, Order, OrderPage, RegisterCustomerInput, UpdateCustomerInput,
};

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct CustomerResponse {
    customer: Customer,
}

#[derive(Deserialize)]
struct AddressDeleteResponse {
    parent: Customer,
}

#[derive(Deserialize)]
struct OrderResponse {
    order: Order,
}

/// A signed-in customer and the bearer token for their session.
#[derive(Clone)]
pub struct CustomerSession {
    /// Bearer token for customer-scoped calls.
    pub token: String,
    /// The customer.
    pub customer: Customer,
}

impl std::fmt::Debug for CustomerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerSession")
            .field("token", &"[REDACTED]")
            .field("customer", &self.customer.id)
            .finish()
    }
}

impl StoreClient {
    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange email and password for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Api { status: 401, .. }` for wrong credentials, or an error if
    /// the API request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, CommerceError> {
        let body = json!({ "email": email, "password": password });
        let response: TokenResponse = self
            .post("/auth/customer/emailpass", &body, None)
            .await?;
        Ok(response.token)
    }

    /// Register a new customer and sign them in.
    ///
    /// Registers the identity, creates the customer with the registration
    /// token, then logs in for a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three calls fail (e.g., the email is
    /// already registered).
    #[instrument(skip(self, input, password), fields(email = %input.email))]
    pub async fn register(
        &self,
        input: &RegisterCustomerInput,
        password: &str,
    ) -> Result<CustomerSession, CommerceError> {
        let body = json!({ "email": input.email, "password": password });
        let registration: TokenResponse = self
            .post("/auth/customer/emailpass/register", &body, None)
            .await?;

        let created: CustomerResponse = self
            .post("/store/customers", input, Some(&registration.token))
            .await?;
        info!(customer_id = %created.customer.id, "Customer registered");

        let token = self.login(&input.email, password).await?;
        Ok(CustomerSession {
            token,
            customer: created.customer,
        })
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get the signed-in customer with their addresses.
    ///
    /// # Errors
    ///
    /// Returns `Api { status: 401, .. }` if the token expired, or an error if
    /// the API request fails.
    #[instrument(skip(self, token))]
    pub async fn retrieve_customer(&self, token: &str) -> Result<Customer, CommerceError> {
        let query = [("fields", "*addresses".to_string())];
        let response: CustomerResponse = self
            .get("/store/customers/me", &query, Some(token))
            .await?;
        Ok(response.customer)
    }

    /// Update the signed-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, input))]
    pub async fn update_customer(
        &self,
        token: &str,
        input: &UpdateCustomerInput,
    ) -> Result<Customer, CommerceError> {
        let response: CustomerResponse = self
            .post("/store/customers/me", input, Some(token))
            .await?;
        Ok(response.customer)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the address.
    #[instrument(skip(self, token, input))]
    pub async fn add_address(
        &self,
        token: &str,
        input: &AddressInput,
    ) -> Result<Customer, CommerceError> {
        let response: CustomerResponse = self
            .post("/store/customers/me/addresses", input, Some(token))
            .await?;
        Ok(response.customer)
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not belong to the customer or the
    /// backend rejects it.
    #[instrument(skip(self, token, input), fields(address_id = %address_id))]
    pub async fn update_address(
        &self,
        token: &str,
        address_id: &AddressId,
        input: &AddressInput,
    ) -> Result<Customer, CommerceError> {
        let response: CustomerResponse = self
            .post(
                &format!("/store/customers/me/addresses/{address_id}"),
                input,
                Some(token),
            )
            .await?;
        Ok(response.customer)
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(address_id = %address_id))]
    pub async fn delete_address(
        &self,
        token: &str,
        address_id: &AddressId,
    ) -> Result<Customer, CommerceError> {
        let response: AddressDeleteResponse = self
            .delete(
                &format!("/store/customers/me/addresses/{address_id}"),
                None,
                Some(token),
            )
            .await?;
        Ok(response.parent)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// The signed-in customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn list_orders(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<OrderPage, CommerceError> {
        let query = [
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("order", "-created_at".to_string()),
        ];
        self.get("/store/orders", &query, Some(token)).await
    }

    /// Get an order by ID.
    ///
    /// Guests may read the order they just placed, so the token is optional.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist, or an error if the API
    /// request fails.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn retrieve_order(
        &self,
        order_id: &OrderId,
        token: Option<&str>,
    ) -> Result<Order, CommerceError> {
        let response: OrderResponse = self
            .get(&format!("/store/orders/{order_id}"), &[], token)
            .await?;
        Ok(response.order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::super::tests::client_for;
    use super::*;

    fn bearer(headers: &HeaderMap) -> String {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim_start_matches("Bearer ")
            .to_string()
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let router = Router::new().route(
            "/auth/customer/emailpass",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"type": "unauthorized", "message": "Invalid email or password"})),
                )
                    .into_response()
            }),
        );
        let client = client_for(router).await;

        let err = client.login("ada@example.com", "nope").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_register_uses_registration_token_then_logs_in() {
        let tokens = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = Arc::clone(&tokens);
        let router = Router::new()
            .route(
                "/auth/customer/emailpass/register",
                post(|| async { Json(json!({"token": "reg_token"})) }),
            )
            .route(
                "/store/customers",
                post(move |headers: HeaderMap, Json(body): Json<Value>| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().unwrap().push(bearer(&headers));
                        Json(json!({
                            "customer": {
                                "id": "cus_1",
                                "email": body["email"],
                                "first_name": body["first_name"]
                            }
                        }))
                    }
                }),
            )
            .route(
                "/auth/customer/emailpass",
                post(|| async { Json(json!({"token": "session_token"})) }),
            );
        let client = client_for(router).await;

        let input = RegisterCustomerInput {
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            phone: None,
        };
        let session = client.register(&input, "correct horse").await.unwrap();

        assert_eq!(session.token, "session_token");
        assert_eq!(session.customer.display_name(), "Ada");
        assert_eq!(*tokens.lock().unwrap(), vec!["reg_token".to_string()]);
        assert!(!format!("{session:?}").contains("session_token"));
    }

    #[tokio::test]
    async fn test_retrieve_customer_sends_bearer_token() {
        let router = Router::new().route(
            "/store/customers/me",
            get(|headers: HeaderMap| async move {
                if bearer(&headers) == "good" {
                    Json(json!({"customer": {"id": "cus_1", "email": "ada@example.com"}}))
                        .into_response()
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"type": "unauthorized", "message": "Unauthorized"})),
                    )
                        .into_response()
                }
            }),
        );
        let client = client_for(router).await;

        let customer = client.retrieve_customer("good").await.unwrap();
        assert_eq!(customer.id.as_str(), "cus_1");

        let err = client.retrieve_customer("expired").await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
