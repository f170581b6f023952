//! Integration tests for customer sign-in, registration and the account area.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use harbor_integration_tests::{PASSWORD, TestApp, location};

const EMAIL: &str = "ada@example.com";

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_page_renders() {
    let app = TestApp::spawn().await;

    let page = app.page("/auth/login?next=/account/orders").await;
    assert!(page.contains("name=\"next\""));
    assert!(page.contains("/account/orders"));
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");

    let response = app
        .post_form("/auth/login", &[("email", EMAIL), ("password", "nope")])
        .await;
    assert_eq!(location(&response), "/auth/login");

    let page = app.page("/auth/login").await;
    assert!(page.contains("Invalid email or password"));
    assert!(page.contains("Sign in"));
}

#[tokio::test]
async fn test_unknown_email_is_reported() {
    let app = TestApp::spawn().await;

    app.post_form(
        "/auth/login",
        &[("email", "nobody@example.com"), ("password", PASSWORD)],
    )
    .await;

    let page = app.page("/auth/login").await;
    assert!(page.contains("No account found for that email"));
}

#[tokio::test]
async fn test_login_keeps_next_on_failure() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", "nobody@example.com"),
                ("password", PASSWORD),
                ("next", "/checkout"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/auth/login?next=%2Fcheckout");
}

#[tokio::test]
async fn test_login_transfers_cart_and_honors_next() {
    let app = TestApp::spawn().await;
    let customer_id = app.backend.add_customer(EMAIL, "Ada");
    app.add_to_cart("var_tote", 1).await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", EMAIL), ("password", PASSWORD), ("next", "/checkout")],
        )
        .await;
    assert_eq!(location(&response), "/checkout");

    let carts = app.backend.cart_ids();
    assert_eq!(carts.len(), 1);
    assert_eq!(app.backend.cart_customer(&carts[0]), Some(customer_id));
    assert_eq!(app.cart_count().await, "1");

    // Checkout prefills the customer's email
    let page = app.page("/checkout").await;
    assert!(page.contains(EMAIL));
    assert!(page.contains("Welcome, Ada!"));
}

#[tokio::test]
async fn test_signed_in_visitor_skips_login_and_keeps_toasts() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");
    app.sign_in(EMAIL).await;

    let response = app.get("/auth/login?next=/cart").await;
    assert_eq!(location(&response), "/cart");
    let response = app.get("/auth/register").await;
    assert_eq!(location(&response), "/account");

    // The welcome toast from signing in is still pending
    let page = app.page("/account").await;
    assert!(page.contains("Welcome, Ada!"));
}

#[tokio::test]
async fn test_external_next_is_ignored() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", EMAIL),
                ("password", PASSWORD),
                ("next", "https://evil.example/"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account");
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_signs_in() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", "grace@example.com"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
                ("first_name", "Grace"),
                ("last_name", "Hopper"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account");

    let page = app.page("/account").await;
    assert!(page.contains("Hi, Grace"));
    assert!(page.contains("grace@example.com"));
}

#[tokio::test]
async fn test_register_existing_email_is_reported() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", EMAIL),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await;
    assert_eq!(location(&response), "/auth/register");

    let page = app.page("/auth/register").await;
    assert!(page.contains("An account with this email already exists"));
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("email", "grace@example.com"),
                ("password", PASSWORD),
                ("password_confirm", "something else"),
                ("next", "/checkout"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/auth/register?next=%2Fcheckout");

    let page = app.page("/auth/register?next=/checkout").await;
    assert!(page.contains("Passwords do not match."));
    assert!(app.backend.cart_ids().is_empty());
}

// =============================================================================
// Account
// =============================================================================

#[tokio::test]
async fn test_account_requires_login() {
    let app = TestApp::spawn().await;

    let response = app.get("/account/orders").await;
    assert_eq!(location(&response), "/auth/login?next=%2Faccount%2Forders");

    let response = app.get("/account").await;
    assert_eq!(location(&response), "/auth/login?next=%2Faccount");
}

#[tokio::test]
async fn test_expired_token_signs_out() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");
    app.sign_in(EMAIL).await;

    app.backend.revoke_tokens();

    let response = app.get("/account").await;
    assert_eq!(location(&response), "/auth/login?next=%2Faccount");

    let page = app.page("/auth/login?next=/account").await;
    assert!(page.contains("Your session has expired. Please sign in again."));
    assert!(!page.contains("Hi, Ada"));
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");
    app.sign_in(EMAIL).await;

    let response = app
        .post_form(
            "/account/profile",
            &[("first_name", "Augusta"), ("last_name", "King")],
        )
        .await;
    assert_eq!(location(&response), "/account");

    let page = app.page("/account").await;
    assert!(page.contains("Profile updated."));
    assert!(page.contains("Augusta"));
}

#[tokio::test]
async fn test_address_book_create_and_delete() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");
    app.sign_in(EMAIL).await;

    let response = app
        .post_form(
            "/account/addresses",
            &[
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("address_1", "1 Harbor Way"),
                ("city", "Portland"),
                ("postal_code", "04101"),
                ("country_code", "us"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account/addresses");

    let page = app.page("/account/addresses").await;
    assert!(page.contains("Address saved."));
    assert!(page.contains("1 Harbor Way"));

    // Missing fields are named and nothing is saved
    app.post_form("/account/addresses", &[("first_name", "Ada")])
        .await;
    let page = app.page("/account/addresses").await;
    assert!(page.contains("Please fill in: last name, address, city, postal code, country."));

    let marker = "/account/addresses?edit=";
    let start = page.find(marker).unwrap() + marker.len();
    let id: String = page[start..].chars().take_while(|c| *c != '"').collect();

    let edit = app.page(&format!("/account/addresses?edit={id}")).await;
    assert!(edit.contains("Edit address"));
    assert!(edit.contains("value=\"1 Harbor Way\""));

    let response = app
        .post_form(
            &format!("/account/addresses/{id}"),
            &[
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("address_1", "2 Harbor Way"),
                ("city", "Portland"),
                ("postal_code", "04101"),
                ("country_code", "us"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/account/addresses");
    let page = app.page("/account/addresses").await;
    assert!(page.contains("Address updated."));
    assert!(page.contains("2 Harbor Way"));

    let response = app
        .post_form(&format!("/account/addresses/{id}/delete"), &[])
        .await;
    assert_eq!(location(&response), "/account/addresses");
    let page = app.page("/account/addresses").await;
    assert!(page.contains("Address removed."));
    assert!(page.contains("No saved addresses."));
}

#[tokio::test]
async fn test_orders_are_listed_after_checkout() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");
    app.sign_in(EMAIL).await;
    app.add_to_cart("var_tote", 1).await;

    let pairs = [
        ("email", EMAIL),
        ("shipping_first_name", "Ada"),
        ("shipping_last_name", "Lovelace"),
        ("shipping_address_1", "1 Harbor Way"),
        ("shipping_city", "Portland"),
        ("shipping_postal_code", "04101"),
        ("shipping_country_code", "us"),
        ("billing_same", "on"),
    ];
    app.post_form("/checkout/address", &pairs).await;
    app.post_form("/checkout/delivery", &[("option_id", "so_standard")])
        .await;
    app.post_form("/checkout/payment", &[("provider_id", "pp_system_default")])
        .await;
    let response = app.post_form("/checkout/complete", &[]).await;
    let confirmed = location(&response).to_string();
    let order_id = confirmed
        .trim_start_matches("/order/")
        .trim_end_matches("/confirmed")
        .to_string();

    let page = app.page("/account/orders").await;
    assert!(page.contains("#1001"));
    assert!(page.contains("$20.00"));

    let page = app.page(&format!("/account/orders/{order_id}")).await;
    assert!(page.contains("Canvas Tote"));
    assert!(page.contains("Standard"));
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_forgets_customer_and_cart() {
    let app = TestApp::spawn().await;
    app.backend.add_customer(EMAIL, "Ada");
    app.sign_in(EMAIL).await;
    app.add_to_cart("var_tote", 1).await;

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(location(&response), "/");

    let page = app.page("/").await;
    assert!(page.contains("You have been signed out."));
    assert!(!page.contains("Hi, Ada"));
    assert_eq!(app.cart_count().await, "0");

    let response = app.get("/account").await;
    assert!(location(&response).starts_with("/auth/login"));
}
