//! End-to-end test harness for the Harbor storefront.
//!
//! [`FakeBackend`] is an in-process Store API written with `axum`. It keeps
//! carts, customers and orders in memory and prices a small fixed catalog,
//! so the storefront can be driven through whole journeys without a real
//! commerce backend. [`TestApp`] serves the storefront against it with an
//! in-memory session store and a cookie-keeping `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p harbor-integration-tests
//! ```
//!
//! No database is needed: sessions live in `tower_sessions::MemoryStore` and
//! the `PostgreSQL` pool is created lazily and never used.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use harbor_core::CountryCode;
use harbor_storefront::config::{CommerceConfig, StorefrontConfig};
use harbor_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower_sessions::MemoryStore;
use url::Url;

/// Publishable key both sides agree on.
pub const PUBLISHABLE_KEY: &str = "pk_test_harbor";

/// Password of every seeded customer.
pub const PASSWORD: &str = "correct horse battery";

/// Promotion code the fake backend accepts (5 off).
pub const PROMO_CODE: &str = "SAVE5";

// =============================================================================
// Catalog
// =============================================================================

struct CatalogVariant {
    id: &'static str,
    title: &'static str,
    price: i64,
    /// Managed inventory; `None` means unmanaged.
    stock: Option<i64>,
}

struct CatalogProduct {
    id: &'static str,
    handle: &'static str,
    title: &'static str,
    collection: &'static str,
    category: &'static str,
    created_at: &'static str,
    variants: &'static [CatalogVariant],
}

/// `(id, handle, title)`
const COLLECTIONS: &[(&str, &str, &str)] = &[
    ("col_summer", "summer", "Summer Edit"),
    ("col_winter", "winter", "Winter Warmers"),
];

/// `(id, handle, name)`
const CATEGORIES: &[(&str, &str, &str)] = &[("cat_tops", "tops", "Tops"), ("cat_bags", "bags", "Bags")];

/// Newest first, which is also the listing's default order.
const CATALOG: &[CatalogProduct] = &[
    CatalogProduct {
        id: "prod_shirt",
        handle: "linen-shirt",
        title: "Linen Shirt",
        collection: "col_summer",
        category: "cat_tops",
        created_at: "2026-05-03T10:00:00Z",
        variants: &[
            CatalogVariant {
                id: "var_shirt_s",
                title: "S",
                price: 30,
                stock: None,
            },
            CatalogVariant {
                id: "var_shirt_m",
                title: "M",
                price: 35,
                stock: None,
            },
        ],
    },
    CatalogProduct {
        id: "prod_tote",
        handle: "canvas-tote",
        title: "Canvas Tote",
        collection: "col_summer",
        category: "cat_bags",
        created_at: "2026-05-02T10:00:00Z",
        variants: &[CatalogVariant {
            id: "var_tote",
            title: "Default",
            price: 15,
            stock: None,
        }],
    },
    CatalogProduct {
        id: "prod_cap",
        handle: "wool-cap",
        title: "Wool Cap",
        collection: "col_winter",
        category: "cat_tops",
        created_at: "2026-05-01T10:00:00Z",
        variants: &[CatalogVariant {
            id: "var_cap",
            title: "Default",
            price: 20,
            stock: Some(0),
        }],
    },
];

/// `(id, name, flat amount)`; options without an amount are calculated.
const SHIPPING_OPTIONS: &[(&str, &str, Option<i64>)] = &[
    ("so_standard", "Standard", Some(5)),
    ("so_express", "Express", None),
];

/// Price the calculate endpoint quotes for calculated options.
const CALCULATED_SHIPPING: i64 = 12;

fn currency_for(region_id: &str) -> &'static str {
    if region_id == "reg_eu" { "eur" } else { "usd" }
}

fn find_variant(id: &str) -> Option<(&'static CatalogProduct, &'static CatalogVariant)> {
    CATALOG.iter().find_map(|product| {
        product
            .variants
            .iter()
            .find(|variant| variant.id == id)
            .map(|variant| (product, variant))
    })
}

fn shipping_amount(option_id: &str) -> Option<i64> {
    SHIPPING_OPTIONS
        .iter()
        .find(|(id, _, _)| *id == option_id)
        .map(|(_, _, amount)| amount.unwrap_or(CALCULATED_SHIPPING))
}

impl CatalogVariant {
    fn to_json(&self, currency: &str) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "manage_inventory": self.stock.is_some(),
            "inventory_quantity": self.stock,
            "calculated_price": {
                "calculated_amount": self.price,
                "original_amount": self.price,
                "currency_code": currency
            }
        })
    }
}

impl CatalogProduct {
    fn to_json(&self, currency: &str) -> Value {
        let collection = COLLECTIONS
            .iter()
            .find(|(id, _, _)| *id == self.collection)
            .map(|(id, handle, title)| json!({"id": id, "handle": handle, "title": title}));
        let categories: Vec<Value> = CATEGORIES
            .iter()
            .filter(|(id, _, _)| *id == self.category)
            .map(|(id, handle, name)| json!({"id": id, "handle": handle, "name": name}))
            .collect();
        let variants: Vec<Value> = self.variants.iter().map(|v| v.to_json(currency)).collect();

        json!({
            "id": self.id,
            "title": self.title,
            "handle": self.handle,
            "description": format!("The {} from the harbor workshop.", self.title.to_lowercase()),
            "collection_id": self.collection,
            "collection": collection,
            "categories": categories,
            "tags": [{"value": "harbor"}],
            "created_at": self.created_at,
            "variants": variants
        })
    }
}

// =============================================================================
// Backend state
// =============================================================================

#[derive(Debug, Clone)]
struct FakeLine {
    id: String,
    variant_id: String,
    quantity: u32,
}

#[derive(Debug, Clone, Default)]
struct FakeCart {
    id: String,
    region_id: String,
    customer_id: Option<String>,
    email: Option<String>,
    lines: Vec<FakeLine>,
    shipping_address: Option<Value>,
    billing_address: Option<Value>,
    shipping_option: Option<String>,
    payment_provider: Option<String>,
    promo_codes: Vec<String>,
    completed: bool,
}

impl FakeCart {
    fn item_subtotal(&self) -> i64 {
        self.lines
            .iter()
            .filter_map(|line| find_variant(&line.variant_id).map(|(_, v)| v.price * i64::from(line.quantity)))
            .sum()
    }

    fn shipping_total(&self) -> i64 {
        self.shipping_option
            .as_deref()
            .and_then(shipping_amount)
            .unwrap_or(0)
    }

    fn discount_total(&self) -> i64 {
        if self.promo_codes.iter().any(|c| c == PROMO_CODE) {
            5.min(self.item_subtotal())
        } else {
            0
        }
    }

    fn total(&self) -> i64 {
        self.item_subtotal() - self.discount_total() + self.shipping_total()
    }

    fn items_json(&self) -> Vec<Value> {
        self.lines
            .iter()
            .filter_map(|line| {
                let (product, variant) = find_variant(&line.variant_id)?;
                let total = variant.price * i64::from(line.quantity);
                Some(json!({
                    "id": line.id,
                    "title": product.title,
                    "quantity": line.quantity,
                    "unit_price": variant.price,
                    "subtotal": total,
                    "total": total,
                    "variant_id": variant.id,
                    "product_id": product.id,
                    "product_handle": product.handle,
                    "product_title": product.title,
                    "variant_title": variant.title
                }))
            })
            .collect()
    }

    fn shipping_methods_json(&self) -> Vec<Value> {
        self.shipping_option
            .iter()
            .filter_map(|option_id| {
                let (_, name, _) = SHIPPING_OPTIONS.iter().find(|(id, _, _)| id == option_id)?;
                Some(json!({
                    "id": format!("sm_{}", self.id),
                    "name": name,
                    "amount": shipping_amount(option_id),
                    "shipping_option_id": option_id
                }))
            })
            .collect()
    }

    fn payment_collection_json(&self) -> Value {
        let sessions: Vec<Value> = self
            .payment_provider
            .iter()
            .map(|provider| {
                json!({"id": format!("ps_{}", self.id), "provider_id": provider, "status": "pending"})
            })
            .collect();
        json!({"id": format!("paycol_{}", self.id), "payment_sessions": sessions})
    }

    fn to_json(&self) -> Value {
        let promotions: Vec<Value> = self
            .promo_codes
            .iter()
            .map(|code| json!({"id": format!("promo_{code}"), "code": code, "is_automatic": false}))
            .collect();

        json!({
            "id": self.id,
            "email": self.email,
            "region_id": self.region_id,
            "currency_code": currency_for(&self.region_id),
            "customer_id": self.customer_id,
            "items": self.items_json(),
            "shipping_address": self.shipping_address,
            "billing_address": self.billing_address,
            "shipping_methods": self.shipping_methods_json(),
            "payment_collection": self.payment_provider.as_ref().map(|_| self.payment_collection_json()),
            "promotions": promotions,
            "item_subtotal": self.item_subtotal(),
            "subtotal": self.item_subtotal(),
            "shipping_total": self.shipping_total(),
            "discount_total": self.discount_total(),
            "tax_total": 0,
            "total": self.total(),
            "completed_at": self.completed.then_some("2026-05-04T09:30:00Z")
        })
    }
}

#[derive(Debug, Clone)]
struct FakeCustomer {
    id: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    addresses: Vec<Value>,
}

impl FakeCustomer {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "phone": self.phone,
            "addresses": self.addresses
        })
    }
}

#[derive(Debug, Clone)]
struct FakeOrder {
    customer_id: Option<String>,
    body: Value,
}

/// Everything the fake backend knows.
#[derive(Debug, Default)]
pub struct FakeState {
    next_id: u64,
    carts: HashMap<String, FakeCart>,
    customers: Vec<FakeCustomer>,
    /// Registration identities (email, password) not yet turned into customers.
    identities: HashMap<String, String>,
    /// Bearer token to customer ID; registration tokens map to the email.
    tokens: HashMap<String, String>,
    orders: HashMap<String, FakeOrder>,
    rejected_shipping_options: Vec<String>,
    completion_error: Option<String>,
    shipping_listing_down: bool,
    cart_reads_down: bool,
    product_queries: Vec<Vec<(String, String)>>,
    keyless_requests: u32,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn customer_for(&self, headers: &HeaderMap) -> Option<&FakeCustomer> {
        let id = self.tokens.get(&bearer(headers)?)?;
        self.customers.iter().find(|c| &c.id == id)
    }

    fn customer_for_mut(&mut self, headers: &HeaderMap) -> Option<&mut FakeCustomer> {
        let id = self.tokens.get(&bearer(headers)?)?.clone();
        self.customers.iter_mut().find(|c| c.id == id)
    }
}

// =============================================================================
// FakeBackend
// =============================================================================

/// In-process Store API.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    url: Option<Url>,
}

impl FakeBackend {
    /// Serve a fresh backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");

        let backend = Self {
            url: Some(Url::parse(&format!("http://{addr}")).expect("Valid backend URL")),
            ..Self::default()
        };
        let router = backend.router();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Fake backend stopped");
        });
        backend
    }

    /// Base URL the storefront should talk to.
    ///
    /// # Panics
    ///
    /// Panics if the backend was not started with [`FakeBackend::spawn`].
    #[must_use]
    pub fn url(&self) -> Url {
        self.url.clone().expect("Fake backend is not running")
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a customer who can sign in with [`PASSWORD`].
    pub fn add_customer(&self, email: &str, first_name: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id("cus");
        state.customers.push(FakeCustomer {
            id: id.clone(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: Some(first_name.to_string()),
            last_name: None,
            phone: None,
            addresses: Vec::new(),
        });
        id
    }

    /// IDs of every cart the backend still has.
    #[must_use]
    pub fn cart_ids(&self) -> Vec<String> {
        self.lock().carts.keys().cloned().collect()
    }

    /// Customer a cart belongs to.
    #[must_use]
    pub fn cart_customer(&self, cart_id: &str) -> Option<String> {
        self.lock().carts.get(cart_id)?.customer_id.clone()
    }

    /// Forget every cart, as a backend cleanup job would.
    pub fn drop_carts(&self) {
        self.lock().carts.clear();
    }

    /// Invalidate every customer token.
    pub fn revoke_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// Refuse to add `option_id` to carts.
    pub fn reject_shipping_option(&self, option_id: &str) {
        self.lock().rejected_shipping_options.push(option_id.to_string());
    }

    /// Answer cart completion with the cart and this error.
    pub fn fail_completion(&self, message: &str) {
        self.lock().completion_error = Some(message.to_string());
    }

    /// Answer shipping option listings with a 503.
    pub fn fail_shipping_listing(&self) {
        self.lock().shipping_listing_down = true;
    }

    /// Answer cart retrievals with a 503. Mutations still work.
    pub fn fail_cart_reads(&self) {
        self.lock().cart_reads_down = true;
    }

    /// Query pairs of every product listing request so far.
    #[must_use]
    pub fn product_queries(&self) -> Vec<Vec<(String, String)>> {
        self.lock().product_queries.clone()
    }

    /// Requests that arrived without the publishable key.
    #[must_use]
    pub fn keyless_requests(&self) -> u32 {
        self.lock().keyless_requests
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/store/regions", get(regions))
            .route("/store/products", get(products))
            .route("/store/collections", get(collections))
            .route("/store/product-categories", get(categories))
            .route("/store/carts", post(create_cart))
            .route("/store/carts/{id}", get(retrieve_cart).post(update_cart))
            .route("/store/carts/{id}/line-items", post(add_line_item))
            .route(
                "/store/carts/{id}/line-items/{line_id}",
                post(update_line_item).delete(delete_line_item),
            )
            .route(
                "/store/carts/{id}/promotions",
                post(apply_promotions).delete(remove_promotions),
            )
            .route("/store/carts/{id}/customer", post(transfer_cart))
            .route("/store/carts/{id}/shipping-methods", post(add_shipping_method))
            .route("/store/carts/{id}/complete", post(complete_cart))
            .route("/store/shipping-options", get(shipping_options))
            .route(
                "/store/shipping-options/{id}/calculate",
                post(calculate_shipping_option),
            )
            .route("/store/payment-providers", get(payment_providers))
            .route("/store/payment-collections", post(create_payment_collection))
            .route(
                "/store/payment-collections/{id}/payment-sessions",
                post(create_payment_session),
            )
            .route("/store/orders", get(list_orders))
            .route("/store/orders/{id}", get(retrieve_order))
            .route("/auth/customer/emailpass", post(login))
            .route("/auth/customer/emailpass/register", post(register_identity))
            .route("/store/customers", post(create_customer))
            .route("/store/customers/me", get(me).post(update_me))
            .route("/store/customers/me/addresses", post(add_address))
            .route(
                "/store/customers/me/addresses/{id}",
                post(update_address).delete(delete_address),
            )
            .layer(from_fn_with_state(self.clone(), require_publishable_key))
            .with_state(self.clone())
    }
}

// =============================================================================
// Handler helpers
// =============================================================================

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn api_error(status: StatusCode, kind: &str, message: &str) -> Response {
    (status, Json(json!({"type": kind, "message": message}))).into_response()
}

fn not_found(what: &str, id: &str) -> Response {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("{what} with id: {id} was not found"),
    )
}

fn unavailable() -> Response {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "unexpected_state",
        "Service temporarily unavailable",
    )
}

fn unauthorized() -> Response {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Apply `change` to a cart and answer with the cart.
fn with_cart(
    backend: &FakeBackend,
    id: &str,
    change: impl FnOnce(&mut FakeCart) -> Result<(), Response>,
) -> Response {
    let mut state = backend.lock();
    let Some(cart) = state.carts.get_mut(id) else {
        return not_found("Cart", id);
    };
    if let Err(response) = change(cart) {
        return response;
    }
    Json(json!({"cart": cart.to_json()})).into_response()
}

async fn require_publishable_key(
    State(backend): State<FakeBackend>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get("x-publishable-api-key")
        .and_then(|v| v.to_str().ok());
    if key != Some(PUBLISHABLE_KEY) {
        backend.lock().keyless_requests += 1;
        return api_error(
            StatusCode::BAD_REQUEST,
            "not_allowed",
            "A valid publishable key is required to proceed with the request",
        );
    }
    next.run(request).await
}

// =============================================================================
// Catalog handlers
// =============================================================================

async fn regions() -> Json<Value> {
    Json(json!({
        "regions": [
            {
                "id": "reg_us",
                "name": "United States",
                "currency_code": "usd",
                "countries": [{"iso_2": "us", "display_name": "United States"}]
            },
            {
                "id": "reg_eu",
                "name": "Europe",
                "currency_code": "eur",
                "countries": [
                    {"iso_2": "dk", "display_name": "Denmark"},
                    {"iso_2": "de", "display_name": "Germany"}
                ]
            }
        ]
    }))
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn all_values<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

async fn products(
    State(backend): State<FakeBackend>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<Value> {
    backend.lock().product_queries.push(pairs.clone());

    let handle = first_value(&pairs, "handle");
    let q = first_value(&pairs, "q").map(str::to_lowercase);
    let collection_ids = all_values(&pairs, "collection_id[]");
    let category_ids = all_values(&pairs, "category_id[]");
    let limit: usize = first_value(&pairs, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);
    let offset: usize = first_value(&pairs, "offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let currency = currency_for(first_value(&pairs, "region_id").unwrap_or("reg_us"));

    let matching: Vec<&CatalogProduct> = CATALOG
        .iter()
        .filter(|p| handle.is_none_or(|h| p.handle == h))
        .filter(|p| q.as_deref().is_none_or(|q| p.title.to_lowercase().contains(q)))
        .filter(|p| collection_ids.is_empty() || collection_ids.contains(&p.collection))
        .filter(|p| category_ids.is_empty() || category_ids.contains(&p.category))
        .collect();

    let page: Vec<Value> = matching
        .iter()
        .skip(offset)
        .take(limit)
        .map(|p| p.to_json(currency))
        .collect();

    Json(json!({
        "products": page,
        "count": matching.len(),
        "offset": offset,
        "limit": limit
    }))
}

async fn collections(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let handle = params.get("handle");
    let found: Vec<Value> = COLLECTIONS
        .iter()
        .filter(|(_, h, _)| handle.is_none_or(|wanted| wanted == h))
        .map(|(id, handle, title)| json!({"id": id, "handle": handle, "title": title}))
        .collect();
    Json(json!({"collections": found, "count": found.len(), "offset": 0, "limit": 100}))
}

async fn categories(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let handle = params.get("handle");
    let found: Vec<Value> = CATEGORIES
        .iter()
        .filter(|(_, h, _)| handle.is_none_or(|wanted| wanted == h))
        .map(|(id, handle, name)| {
            json!({
                "id": id,
                "handle": handle,
                "name": name,
                "description": format!("{name} for every season"),
                "category_children": []
            })
        })
        .collect();
    Json(json!({"product_categories": found, "count": found.len()}))
}

// =============================================================================
// Cart handlers
// =============================================================================

async fn create_cart(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = backend.lock();
    let customer = state.customer_for(&headers).map(|c| (c.id.clone(), c.email.clone()));
    let id = state.next_id("cart");
    let cart = FakeCart {
        id: id.clone(),
        region_id: text(&body, "region_id").unwrap_or_else(|| "reg_us".to_string()),
        email: customer.as_ref().map(|(_, email)| email.clone()),
        customer_id: customer.map(|(id, _)| id),
        ..FakeCart::default()
    };
    let json = cart.to_json();
    state.carts.insert(id, cart);
    Json(json!({"cart": json})).into_response()
}

async fn retrieve_cart(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Response {
    if backend.lock().cart_reads_down {
        return unavailable();
    }
    with_cart(&backend, &id, |_| Ok(()))
}

async fn update_cart(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    with_cart(&backend, &id, |cart| {
        if let Some(email) = text(&body, "email") {
            cart.email = Some(email);
        }
        if let Some(region_id) = text(&body, "region_id") {
            cart.region_id = region_id;
        }
        if let Some(address) = body.get("shipping_address") {
            cart.shipping_address = Some(address.clone());
        }
        if let Some(address) = body.get("billing_address") {
            cart.billing_address = Some(address.clone());
        }
        Ok(())
    })
}

async fn add_line_item(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let variant_id = text(&body, "variant_id").unwrap_or_default();
    let quantity = body
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);

    with_cart(&backend, &id, |cart| {
        let Some((_, variant)) = find_variant(&variant_id) else {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "invalid_data",
                &format!("Variant {variant_id} does not exist"),
            ));
        };
        let existing = cart
            .lines
            .iter()
            .find(|l| l.variant_id == variant_id)
            .map_or(0, |l| l.quantity);
        if variant
            .stock
            .is_some_and(|stock| stock < i64::from(existing + quantity))
        {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "not_allowed",
                "Some variant does not have the required inventory",
            ));
        }

        match cart.lines.iter_mut().find(|l| l.variant_id == variant_id) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(FakeLine {
                id: format!("li_{variant_id}"),
                variant_id: variant_id.clone(),
                quantity,
            }),
        }
        Ok(())
    })
}

async fn update_line_item(
    State(backend): State<FakeBackend>,
    Path((id, line_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let quantity = body
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);

    with_cart(&backend, &id, |cart| {
        let Some(line) = cart.lines.iter_mut().find(|l| l.id == line_id) else {
            return Err(not_found("Line item", &line_id));
        };
        line.quantity = quantity;
        Ok(())
    })
}

async fn delete_line_item(
    State(backend): State<FakeBackend>,
    Path((id, line_id)): Path<(String, String)>,
) -> Response {
    let mut state = backend.lock();
    let Some(cart) = state.carts.get_mut(&id) else {
        return not_found("Cart", &id);
    };
    cart.lines.retain(|l| l.id != line_id);
    Json(json!({"id": line_id, "object": "line-item", "deleted": true, "parent": cart.to_json()}))
        .into_response()
}

fn codes(body: &Value) -> Vec<String> {
    body.get("promo_codes")
        .and_then(Value::as_array)
        .map(|codes| {
            codes
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn apply_promotions(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    // Unknown codes are ignored and the cart comes back unchanged
    with_cart(&backend, &id, |cart| {
        for code in codes(&body) {
            let known = code.eq_ignore_ascii_case(PROMO_CODE);
            if known && !cart.promo_codes.iter().any(|c| c == PROMO_CODE) {
                cart.promo_codes.push(PROMO_CODE.to_string());
            }
        }
        Ok(())
    })
}

async fn remove_promotions(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let removed = codes(&body);
    with_cart(&backend, &id, |cart| {
        cart.promo_codes
            .retain(|code| !removed.iter().any(|r| r.eq_ignore_ascii_case(code)));
        Ok(())
    })
}

async fn transfer_cart(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let customer = backend
        .lock()
        .customer_for(&headers)
        .map(|c| (c.id.clone(), c.email.clone()));
    let Some((customer_id, email)) = customer else {
        return unauthorized();
    };
    with_cart(&backend, &id, |cart| {
        cart.customer_id = Some(customer_id);
        cart.email = Some(email);
        Ok(())
    })
}

// =============================================================================
// Checkout handlers
// =============================================================================

async fn shipping_options(State(backend): State<FakeBackend>) -> Response {
    if backend.lock().shipping_listing_down {
        return unavailable();
    }
    let options: Vec<Value> = SHIPPING_OPTIONS
        .iter()
        .map(|(id, name, amount)| match amount {
            Some(amount) => json!({"id": id, "name": name, "price_type": "flat", "amount": amount}),
            None => json!({"id": id, "name": name, "price_type": "calculated"}),
        })
        .collect();
    Json(json!({"shipping_options": options})).into_response()
}

async fn calculate_shipping_option(Path(id): Path<String>) -> Response {
    match SHIPPING_OPTIONS.iter().find(|(option, _, _)| *option == id) {
        Some((option, name, _)) => Json(json!({
            "shipping_option": {
                "id": option,
                "name": name,
                "price_type": "calculated",
                "amount": CALCULATED_SHIPPING
            }
        }))
        .into_response(),
        None => not_found("Shipping option", &id),
    }
}

async fn add_shipping_method(
    State(backend): State<FakeBackend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let option_id = text(&body, "option_id").unwrap_or_default();
    let rejected = backend.lock().rejected_shipping_options.contains(&option_id);

    with_cart(&backend, &id, |cart| {
        if rejected || shipping_amount(&option_id).is_none() {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "invalid_data",
                "Shipping option is not available for this cart",
            ));
        }
        cart.shipping_option = Some(option_id.clone());
        Ok(())
    })
}

async fn payment_providers() -> Json<Value> {
    Json(json!({
        "payment_providers": [
            {"id": "pp_system_default", "is_enabled": true},
            {"id": "pp_retired", "is_enabled": false}
        ]
    }))
}

async fn create_payment_collection(
    State(backend): State<FakeBackend>,
    Json(body): Json<Value>,
) -> Response {
    let cart_id = text(&body, "cart_id").unwrap_or_default();
    let state = backend.lock();
    match state.carts.get(&cart_id) {
        Some(cart) => Json(json!({"payment_collection": cart.payment_collection_json()})).into_response(),
        None => not_found("Cart", &cart_id),
    }
}

async fn create_payment_session(
    State(backend): State<FakeBackend>,
    Path(collection_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let cart_id = collection_id
        .strip_prefix("paycol_")
        .unwrap_or_default()
        .to_string();
    let provider = text(&body, "provider_id").unwrap_or_default();

    let mut state = backend.lock();
    let Some(cart) = state.carts.get_mut(&cart_id) else {
        return not_found("Payment collection", &collection_id);
    };
    cart.payment_provider = Some(provider);
    Json(json!({"payment_collection": cart.payment_collection_json()})).into_response()
}

async fn complete_cart(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Response {
    let mut state = backend.lock();
    let Some(cart) = state.carts.get(&id).cloned() else {
        return not_found("Cart", &id);
    };

    if let Some(message) = state.completion_error.clone() {
        return Json(json!({
            "type": "cart",
            "cart": cart.to_json(),
            "error": {"message": message, "name": "PaymentError"}
        }))
        .into_response();
    }

    let order_id = state.next_id("order");
    let display_id = 1000 + state.orders.len() + 1;
    let order = json!({
        "id": order_id,
        "display_id": display_id,
        "email": cart.email,
        "status": "pending",
        "payment_status": "authorized",
        "fulfillment_status": "not_fulfilled",
        "currency_code": currency_for(&cart.region_id),
        "items": cart.items_json(),
        "shipping_address": cart.shipping_address,
        "billing_address": cart.billing_address,
        "shipping_methods": cart.shipping_methods_json(),
        "item_subtotal": cart.item_subtotal(),
        "shipping_total": cart.shipping_total(),
        "discount_total": cart.discount_total(),
        "tax_total": 0,
        "total": cart.total(),
        "created_at": "2026-05-04T09:30:00Z"
    });

    if let Some(stored) = state.carts.get_mut(&id) {
        stored.completed = true;
    }
    state.orders.insert(
        order_id,
        FakeOrder {
            customer_id: cart.customer_id.clone(),
            body: order.clone(),
        },
    );
    Json(json!({"type": "order", "order": order})).into_response()
}

async fn retrieve_order(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Response {
    match backend.lock().orders.get(&id) {
        Some(order) => Json(json!({"order": order.body})).into_response(),
        None => not_found("Order", &id),
    }
}

async fn list_orders(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    let state = backend.lock();
    let Some(customer) = state.customer_for(&headers) else {
        return unauthorized();
    };
    let orders: Vec<Value> = state
        .orders
        .values()
        .filter(|o| o.customer_id.as_deref() == Some(customer.id.as_str()))
        .map(|o| o.body.clone())
        .collect();
    Json(json!({"orders": orders, "count": orders.len()})).into_response()
}

// =============================================================================
// Customer handlers
// =============================================================================

async fn login(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    let email = text(&body, "email").unwrap_or_default();
    let password = text(&body, "password").unwrap_or_default();

    let mut state = backend.lock();
    let Some(customer) = state.customers.iter().find(|c| c.email == email) else {
        // Unknown identities answer 404 so the storefront can say so
        return api_error(StatusCode::NOT_FOUND, "not_found", "Identity not found");
    };
    if customer.password != password {
        return api_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Invalid email or password",
        );
    }
    let customer_id = customer.id.clone();
    let token = state.next_id("tok");
    state.tokens.insert(token.clone(), customer_id);
    Json(json!({"token": token})).into_response()
}

async fn register_identity(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    let email = text(&body, "email").unwrap_or_default();
    let password = text(&body, "password").unwrap_or_default();

    let mut state = backend.lock();
    if state.customers.iter().any(|c| c.email == email) || state.identities.contains_key(&email) {
        return api_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Identity with email already exists",
        );
    }
    let token = state.next_id("reg");
    state.identities.insert(email.clone(), password);
    state.tokens.insert(token.clone(), email);
    Json(json!({"token": token})).into_response()
}

async fn create_customer(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = backend.lock();
    let Some(email) = bearer(&headers).and_then(|t| state.tokens.get(&t).cloned()) else {
        return unauthorized();
    };
    let Some(password) = state.identities.remove(&email) else {
        return unauthorized();
    };

    let id = state.next_id("cus");
    let customer = FakeCustomer {
        id,
        email,
        password,
        first_name: text(&body, "first_name"),
        last_name: text(&body, "last_name"),
        phone: text(&body, "phone"),
        addresses: Vec::new(),
    };
    let json = customer.to_json();
    state.customers.push(customer);
    Json(json!({"customer": json})).into_response()
}

async fn me(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    match backend.lock().customer_for(&headers) {
        Some(customer) => Json(json!({"customer": customer.to_json()})).into_response(),
        None => unauthorized(),
    }
}

/// Apply `change` to the signed-in customer and answer with the customer
/// under `key`.
fn with_customer(
    backend: &FakeBackend,
    headers: &HeaderMap,
    key: &str,
    change: impl FnOnce(&mut FakeCustomer, &mut u64) -> Result<(), Response>,
) -> Response {
    let mut state = backend.lock();
    let mut next_id = state.next_id;
    let Some(customer) = state.customer_for_mut(headers) else {
        return unauthorized();
    };
    if let Err(response) = change(customer, &mut next_id) {
        return response;
    }
    let json = customer.to_json();
    state.next_id = next_id;
    Json(json!({ key: json })).into_response()
}

async fn update_me(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    with_customer(&backend, &headers, "customer", |customer, _| {
        if let Some(first_name) = text(&body, "first_name") {
            customer.first_name = Some(first_name);
        }
        if let Some(last_name) = text(&body, "last_name") {
            customer.last_name = Some(last_name);
        }
        if let Some(phone) = text(&body, "phone") {
            customer.phone = Some(phone);
        }
        Ok(())
    })
}

async fn add_address(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    with_customer(&backend, &headers, "customer", |customer, next_id| {
        *next_id += 1;
        if let Some(address) = body.as_object_mut() {
            address.insert("id".to_string(), json!(format!("addr_{next_id}")));
            address.insert(
                "is_default_shipping".to_string(),
                json!(customer.addresses.is_empty()),
            );
        }
        customer.addresses.push(body);
        Ok(())
    })
}

async fn update_address(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    with_customer(&backend, &headers, "customer", |customer, _| {
        let Some(address) = customer
            .addresses
            .iter_mut()
            .find(|a| a.get("id").and_then(Value::as_str) == Some(id.as_str()))
        else {
            return Err(not_found("Address", &id));
        };
        if let (Some(address), Some(changes)) = (address.as_object_mut(), body.as_object()) {
            address.extend(changes.clone());
        }
        Ok(())
    })
}

async fn delete_address(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    with_customer(&backend, &headers, "parent", |customer, _| {
        customer
            .addresses
            .retain(|a| a.get("id").and_then(Value::as_str) != Some(id.as_str()));
        Ok(())
    })
}

// =============================================================================
// Storefront under test
// =============================================================================

/// Storefront configuration pointed at `backend_url`.
///
/// # Panics
///
/// Panics if the built-in default country is rejected.
#[must_use]
pub fn storefront_config(backend_url: Url) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://harbor@127.0.0.1:1/harbor_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from("Kq7v-Zp2x!Lm9w#Rt4y-Hb6n$Jc8d-Fg3s"),
        default_country: CountryCode::parse("us").expect("Valid default country"),
        commerce: CommerceConfig::new(backend_url, PUBLISHABLE_KEY),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Storefront router backed by `backend` and an in-memory session store.
///
/// The database pool is lazy and points at a closed port, so the readiness
/// check fails fast.
///
/// # Panics
///
/// Panics if the application state cannot be built.
#[must_use]
pub fn storefront_router(backend: &FakeBackend) -> Router {
    let config = storefront_config(backend.url());
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy("postgres://harbor@127.0.0.1:1/harbor_test")
        .expect("Valid lazy pool URL");
    let state = AppState::new(config, pool).expect("Failed to build storefront state");
    harbor_storefront::app(state, MemoryStore::default(), None)
}

/// A running storefront and the backend it talks to.
pub struct TestApp {
    /// Storefront base URL, e.g. `http://127.0.0.1:41234`.
    pub address: String,
    /// Client that keeps the session cookie and does not follow redirects.
    pub client: reqwest::Client,
    /// The fake Store API.
    pub backend: FakeBackend,
}

impl TestApp {
    /// Start a backend and a storefront on ephemeral ports.
    ///
    /// # Panics
    ///
    /// Panics if either server cannot start.
    pub async fn spawn() -> Self {
        let backend = FakeBackend::spawn().await;
        let router = storefront_router(&backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Storefront stopped");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            address: format!("http://{addr}"),
            client,
            backend,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    /// GET `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// GET `path` and return the body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the page is not a 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.expect("Unreadable body")
    }

    /// POST a form to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// POST a form to `path` the way HTMX does.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("HTMX POST failed")
    }

    /// Add a variant to the session's cart with a plain form post.
    ///
    /// # Panics
    ///
    /// Panics if the storefront does not redirect to the cart.
    pub async fn add_to_cart(&self, variant_id: &str, quantity: u32) {
        let quantity = quantity.to_string();
        let response = self
            .post_form(
                "/cart/add",
                &[("variant_id", variant_id), ("quantity", quantity.as_str())],
            )
            .await;
        assert_eq!(location(&response), "/cart");
    }

    /// Sign in a customer added with [`FakeBackend::add_customer`].
    ///
    /// # Panics
    ///
    /// Panics if the storefront does not redirect to the account page.
    pub async fn sign_in(&self, email: &str) {
        let response = self
            .post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(location(&response), "/account");
    }

    /// Cart badge count as the storefront reports it.
    ///
    /// # Panics
    ///
    /// Panics if the badge cannot be fetched.
    pub async fn cart_count(&self) -> String {
        let body = self.page("/cart/count").await;
        body.split('>')
            .nth(1)
            .and_then(|rest| rest.split('<').next())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// `Location` header of a redirect, or `""`.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
