//! Integration tests for the checkout wizard.
//!
//! Steps unlock from the cart's own state, so these tests walk the wizard
//! through the fake Store API and check both the happy path and that every
//! failure leaves the visitor on the step that failed.

#![allow(clippy::unwrap_used)]

use harbor_integration_tests::{TestApp, location};

fn address_form(city: &str) -> Vec<(&'static str, String)> {
    vec![
        ("email", "ada@example.com".to_string()),
        ("shipping_first_name", "Ada".to_string()),
        ("shipping_last_name", "Lovelace".to_string()),
        ("shipping_address_1", "12 Quay Street".to_string()),
        ("shipping_city", city.to_string()),
        ("shipping_postal_code", "04101".to_string()),
        ("shipping_country_code", "us".to_string()),
        ("billing_same", "on".to_string()),
    ]
}

async fn submit_address(app: &TestApp, city: &str) -> reqwest::Response {
    let form = address_form(city);
    let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();
    app.post_form("/checkout/address", &pairs).await
}

/// Cart with two shirts, addressed and on the delivery step.
async fn addressed_app() -> TestApp {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_shirt_s", 2).await;
    let response = submit_address(&app, "Portland").await;
    assert_eq!(location(&response), "/checkout?step=delivery");
    app
}

/// Cart that has reached the review step with express shipping.
async fn reviewable_app() -> TestApp {
    let app = addressed_app().await;
    let response = app
        .post_form("/checkout/delivery", &[("option_id", "so_express")])
        .await;
    assert_eq!(location(&response), "/checkout?step=payment");
    let response = app
        .post_form("/checkout/payment", &[("provider_id", "pp_system_default")])
        .await;
    assert_eq!(location(&response), "/checkout?step=review");
    app
}

// =============================================================================
// Entry
// =============================================================================

#[tokio::test]
async fn test_checkout_without_cart_redirects_to_cart() {
    let app = TestApp::spawn().await;

    let response = app.get("/checkout").await;
    assert_eq!(location(&response), "/cart");
    assert!(app.page("/cart").await.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_new_cart_starts_at_address() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;

    let page = app.page("/checkout").await;
    assert!(page.contains("action=\"/checkout/address\""));
    assert!(!page.contains("action=\"/checkout/delivery\""));
}

// =============================================================================
// Step Gating
// =============================================================================

#[tokio::test]
async fn test_requested_step_is_clamped_to_furthest() {
    let app = addressed_app().await;

    let page = app.page("/checkout?step=review").await;
    assert!(page.contains("action=\"/checkout/delivery\""));
    assert!(!page.contains("action=\"/checkout/complete\""));

    // Earlier steps stay reachable
    let page = app.page("/checkout?step=address").await;
    assert!(page.contains("action=\"/checkout/address\""));
    assert!(page.contains("12 Quay Street"));
}

#[tokio::test]
async fn test_posting_a_locked_step_redirects_to_furthest() {
    let app = addressed_app().await;

    let response = app
        .post_form("/checkout/payment", &[("provider_id", "pp_system_default")])
        .await;
    assert_eq!(location(&response), "/checkout?step=delivery");

    let response = app.post_form("/checkout/complete", &[]).await;
    assert_eq!(location(&response), "/checkout?step=delivery");
}

#[tokio::test]
async fn test_invalid_address_stays_on_address() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;

    let response = submit_address(&app, "").await;
    assert_eq!(location(&response), "/checkout?step=address");

    let page = app.page("/checkout").await;
    assert!(page.contains("Please fill in: city."));
    assert!(page.contains("action=\"/checkout/address\""));
}

// =============================================================================
// Delivery and Payment
// =============================================================================

#[tokio::test]
async fn test_delivery_lists_flat_and_calculated_prices() {
    let app = addressed_app().await;

    let page = app.page("/checkout?step=delivery").await;
    assert!(page.contains("Standard"));
    assert!(page.contains("$5.00"));
    assert!(page.contains("Express"));
    assert!(page.contains("$12.00"));
}

#[tokio::test]
async fn test_rejected_shipping_option_stays_on_delivery() {
    let app = addressed_app().await;
    app.backend.reject_shipping_option("so_standard");

    let response = app
        .post_form("/checkout/delivery", &[("option_id", "so_standard")])
        .await;
    assert_eq!(location(&response), "/checkout?step=delivery");

    let page = app.page("/checkout").await;
    assert!(page.contains("Shipping option is not available for this cart"));
    assert!(page.contains("action=\"/checkout/delivery\""));
}

#[tokio::test]
async fn test_shipping_outage_renders_delivery_with_toast() {
    let app = addressed_app().await;
    app.backend.reject_shipping_option("so_standard");
    app.post_form("/checkout/delivery", &[("option_id", "so_standard")])
        .await;
    app.backend.fail_shipping_listing();

    let page = app.page("/checkout?step=delivery").await;
    // The toast from the failed post survives alongside the new one
    assert!(page.contains("Shipping option is not available for this cart"));
    assert!(page.contains("Something went wrong, please try again."));
    assert!(page.contains("Delivery options could not be loaded."));
    assert!(page.contains("action=\"/checkout/delivery\""));
}

#[tokio::test]
async fn test_payment_lists_enabled_providers() {
    let app = addressed_app().await;
    app.post_form("/checkout/delivery", &[("option_id", "so_standard")])
        .await;

    let page = app.page("/checkout?step=payment").await;
    assert!(page.contains("Manual payment"));
    assert!(!page.contains("pp_retired"));
}

// =============================================================================
// Completion
// =============================================================================

#[tokio::test]
async fn test_full_checkout_places_order() {
    let app = reviewable_app().await;

    let review = app.page("/checkout").await;
    assert!(review.contains("action=\"/checkout/complete\""));
    assert!(review.contains("ada@example.com"));
    assert!(review.contains("Express"));
    assert!(review.contains("Manual payment"));
    // Two shirts at 30 plus calculated shipping
    assert!(review.contains("$72.00"));

    let response = app.post_form("/checkout/complete", &[]).await;
    let target = location(&response).to_string();
    assert!(target.starts_with("/order/"), "unexpected redirect {target}");
    assert!(target.ends_with("/confirmed"));

    let confirmation = app.page(&target).await;
    assert!(confirmation.contains("Thank you! Your order has been placed."));
    assert!(confirmation.contains("#1001"));
    assert!(confirmation.contains("$72.00"));

    assert_eq!(app.cart_count().await, "0");
    let response = app.get("/checkout").await;
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_failed_completion_stays_on_review() {
    let app = reviewable_app().await;
    app.backend.fail_completion("Payment was declined");

    let response = app.post_form("/checkout/complete", &[]).await;
    assert_eq!(location(&response), "/checkout?step=review");

    let page = app.page("/checkout").await;
    assert!(page.contains("Payment was declined"));
    assert!(page.contains("action=\"/checkout/complete\""));
    assert_eq!(app.cart_count().await, "2");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app.get("/order/order_missing/confirmed").await;
    assert_eq!(response.status(), 404);
}
