//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Home page
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database)
//!
//! # Catalog
//! GET  /store                      - Product listing (page, sort, collection, category, q)
//! GET  /search                     - Search entry point (redirects to /store?q=)
//! GET  /products/{handle}          - Product detail (?variant=)
//! GET  /collections                - Collection listing
//! GET  /collections/{handle}       - Collection products
//! GET  /categories                 - Category tree
//! GET  /categories/{handle}        - Category products
//! POST /region                     - Switch country
//!
//! # Cart
//! GET  /cart                       - Cart page
//! GET  /cart/count                 - Cart count badge (fragment)
//! POST /cart/add                   - Add to cart (badge fragment for HTMX, else redirect)
//! POST /cart/update                - Change quantity (0 removes)
//! POST /cart/remove                - Remove item
//! POST /cart/promotions            - Apply promotion code
//! POST /cart/promotions/remove     - Remove promotion code
//!
//! # Checkout
//! GET  /checkout?step=             - Wizard step (clamped to the furthest unlocked step)
//! POST /checkout/address           - Email and addresses
//! POST /checkout/delivery          - Shipping option
//! POST /checkout/payment           - Payment provider
//! POST /checkout/complete          - Place order
//! GET  /order/{id}/confirmed       - Order confirmation
//!
//! # Auth (rate limited)
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action
//! GET  /auth/register              - Register page
//! POST /auth/register              - Register action
//! POST /auth/logout                - Logout action
//!
//! # Account (requires auth)
//! GET  /account                    - Overview
//! POST /account/profile            - Update profile
//! GET  /account/addresses          - Address book (?edit=)
//! POST /account/addresses          - Create address
//! POST /account/addresses/{id}     - Update address
//! POST /account/addresses/{id}/delete - Delete address
//! GET  /account/orders             - Order history
//! GET  /account/orders/{id}        - Order detail
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod collections;
pub mod home;
pub mod order;
pub mod products;
pub mod region;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
///
/// Kept separate so the caller can wrap it in the rate limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/store", get(products::index))
        .route("/search", get(products::search))
        .route("/products/{handle}", get(products::show))
        .route("/collections", get(collections::index))
        .route("/collections/{handle}", get(collections::show))
        .route("/categories", get(categories::index))
        .route("/categories/{handle}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/promotions", post(cart::apply_promotion))
        .route("/promotions/remove", post(cart::remove_promotion))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/address", post(checkout::submit_address))
        .route("/delivery", post(checkout::submit_delivery))
        .route("/payment", post(checkout::submit_payment))
        .route("/complete", post(checkout::complete))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/profile", post(account::update_profile))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
}

/// Create all page routes except `/auth` (see [`auth_routes`]).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(catalog_routes())
        .route("/region", post(region::update))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/order/{id}/confirmed", get(order::confirmed))
        .nest("/account", account_routes())
}
