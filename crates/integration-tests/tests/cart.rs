//! Integration tests for the session cart.
//!
//! Every request goes through the storefront router against the fake Store
//! API, so badge counts and totals are the ones the backend returned.

#![allow(clippy::unwrap_used)]

use harbor_integration_tests::{PROMO_CODE, TestApp, location};

// =============================================================================
// Add to Cart
// =============================================================================

#[tokio::test]
async fn test_htmx_add_returns_badge_and_trigger() {
    let app = TestApp::spawn().await;

    let response = app
        .htmx_post(
            "/cart/add",
            &[("variant_id", "var_shirt_s"), ("quantity", "2")],
        )
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("HX-Trigger")
            .and_then(|v| v.to_str().ok()),
        Some("cart-updated")
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("id=\"cart-count\""));
    assert!(body.contains(">2</span>"));

    assert_eq!(app.cart_count().await, "2");
    assert_eq!(app.backend.cart_ids().len(), 1);
}

#[tokio::test]
async fn test_plain_add_redirects_to_cart_with_toast() {
    let app = TestApp::spawn().await;

    app.add_to_cart("var_tote", 1).await;

    let page = app.page("/cart").await;
    assert!(page.contains("Added to your cart."));
    assert!(page.contains("Canvas Tote"));
    assert!(page.contains("$15.00"));

    // Toasts are shown once
    let again = app.page("/cart").await;
    assert!(!again.contains("Added to your cart."));
}

#[tokio::test]
async fn test_adding_twice_reuses_the_cart() {
    let app = TestApp::spawn().await;

    app.add_to_cart("var_tote", 1).await;
    app.add_to_cart("var_tote", 2).await;

    assert_eq!(app.backend.cart_ids().len(), 1);
    assert_eq!(app.cart_count().await, "3");
    assert!(app.page("/cart").await.contains("$45.00"));
}

#[tokio::test]
async fn test_sold_out_add_refreshes_with_error_toast() {
    let app = TestApp::spawn().await;

    let response = app
        .htmx_post(
            "/cart/add",
            &[
                ("variant_id", "var_cap"),
                ("quantity", "1"),
                ("return_to", "/products/wool-cap"),
            ],
        )
        .await;

    assert_eq!(
        response
            .headers()
            .get("HX-Refresh")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );

    let page = app.page("/products/wool-cap").await;
    assert!(page.contains("Some variant does not have the required inventory"));
    assert_eq!(app.cart_count().await, "0");
}

#[tokio::test]
async fn test_failed_plain_add_returns_to_product() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/cart/add",
            &[("variant_id", "var_cap"), ("return_to", "/products/wool-cap")],
        )
        .await;
    assert_eq!(location(&response), "/products/wool-cap");

    let response = app
        .post_form(
            "/cart/add",
            &[("variant_id", "var_cap"), ("return_to", "https://evil.example")],
        )
        .await;
    assert_eq!(location(&response), "/cart");
}

// =============================================================================
// Cart Page Mutations
// =============================================================================

#[tokio::test]
async fn test_htmx_update_returns_items_fragment() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_shirt_m", 1).await;

    let response = app
        .htmx_post(
            "/cart/update",
            &[("line_id", "li_var_shirt_m"), ("quantity", "3")],
        )
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("HX-Trigger"));
    let body = response.text().await.unwrap();
    assert!(body.contains("id=\"cart-items\""));
    assert!(body.contains("$105.00"));
    assert_eq!(app.cart_count().await, "3");
}

#[tokio::test]
async fn test_quantity_zero_removes_the_line() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;
    app.add_to_cart("var_shirt_s", 1).await;

    let response = app
        .post_form(
            "/cart/update",
            &[("line_id", "li_var_tote"), ("quantity", "0")],
        )
        .await;
    assert_eq!(location(&response), "/cart");

    let page = app.page("/cart").await;
    assert!(!page.contains("Canvas Tote"));
    assert!(page.contains("Linen Shirt"));
    assert_eq!(app.cart_count().await, "1");
}

#[tokio::test]
async fn test_remove_last_item_leaves_empty_cart() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;

    let response = app
        .htmx_post("/cart/remove", &[("line_id", "li_var_tote")])
        .await;
    let body = response.text().await.unwrap();
    assert!(body.contains("Your cart is empty."));
    assert_eq!(app.cart_count().await, "0");
}

#[tokio::test]
async fn test_update_unknown_line_shows_error() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;

    let response = app
        .htmx_post(
            "/cart/update",
            &[("line_id", "li_missing"), ("quantity", "2")],
        )
        .await;
    assert!(response.headers().contains_key("HX-Refresh"));
    assert_eq!(app.cart_count().await, "1");
}

// =============================================================================
// Promotions
// =============================================================================

#[tokio::test]
async fn test_promotion_applied_and_removed() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_shirt_s", 1).await;

    let response = app.post_form("/cart/promotions", &[("code", "save5")]).await;
    assert_eq!(location(&response), "/cart");

    let page = app.page("/cart").await;
    assert!(page.contains("Code save5 applied."));
    assert!(page.contains(PROMO_CODE));
    assert!(page.contains("$25.00"));

    let response = app
        .post_form("/cart/promotions/remove", &[("code", PROMO_CODE)])
        .await;
    assert_eq!(location(&response), "/cart");
    let page = app.page("/cart").await;
    assert!(!page.contains("$25.00"));
    assert!(page.contains("$30.00"));
}

#[tokio::test]
async fn test_unknown_promotion_is_reported() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;

    app.post_form("/cart/promotions", &[("code", "BOGUS")]).await;

    let page = app.page("/cart").await;
    assert!(page.contains("Code BOGUS is not valid for this cart."));
}

#[tokio::test]
async fn test_blank_promotion_is_rejected_locally() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;

    app.post_form("/cart/promotions", &[("code", "  ")]).await;

    assert!(app.page("/cart").await.contains("Please enter a promotion code."));
}

// =============================================================================
// Stale Carts
// =============================================================================

#[tokio::test]
async fn test_cart_unknown_to_backend_is_dropped() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;
    assert_eq!(app.cart_count().await, "1");

    app.backend.drop_carts();

    let page = app.page("/cart").await;
    assert!(page.contains("Your cart is empty."));
    assert_eq!(app.cart_count().await, "0");

    // The next add starts a fresh cart
    app.add_to_cart("var_tote", 1).await;
    assert_eq!(app.backend.cart_ids().len(), 1);
    assert_eq!(app.cart_count().await, "1");
}

#[tokio::test]
async fn test_mutating_a_vanished_cart_drops_it() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;
    app.backend.drop_carts();

    let response = app
        .post_form(
            "/cart/update",
            &[("line_id", "li_var_tote"), ("quantity", "2")],
        )
        .await;
    assert_eq!(location(&response), "/cart");
    assert_eq!(app.cart_count().await, "0");
    assert!(
        app.page("/cart")
            .await
            .contains("Your cart has expired. Please add your items again.")
    );

    // Same for HTMX removals and promotion codes
    app.add_to_cart("var_tote", 1).await;
    app.backend.drop_carts();
    let response = app
        .htmx_post("/cart/remove", &[("line_id", "li_var_tote")])
        .await;
    assert!(response.headers().contains_key("HX-Refresh"));
    assert_eq!(app.cart_count().await, "0");

    app.add_to_cart("var_tote", 1).await;
    app.backend.drop_carts();
    app.post_form("/cart/promotions", &[("code", PROMO_CODE)])
        .await;
    assert_eq!(app.cart_count().await, "0");
    assert!(app.page("/cart").await.contains("Your cart has expired."));
}

#[tokio::test]
async fn test_every_backend_call_carries_publishable_key() {
    let app = TestApp::spawn().await;
    app.add_to_cart("var_tote", 1).await;
    app.page("/cart").await;

    assert_eq!(app.backend.keyless_requests(), 0);
}
