//! Domain types for the commerce Store API.
//!
//! These are client-side projections of backend-owned entities, deserialized
//! straight from the Store API JSON. Missing or `null` fields fall back to
//! defaults so a backend that omits an expanded relation does not break a page.

use harbor_core::{
    AddressId, CartId, CategoryId, CollectionId, CountryCode, CurrencyCode, CustomerId,
    FulfillmentStatus, LineItemId, OrderId, OrderStatus, PaymentCollectionId, PaymentProviderId,
    PaymentStatus, Price, ProductId, RegionId, ShippingOptionId, VariantId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fields requested on product reads so variants come back priced and with stock.
pub const PRODUCT_FIELDS: &str =
    "*variants.calculated_price,+variants.inventory_quantity,*collection,*categories,*images";

/// Build a display price from a backend amount and its lowercase currency code.
#[must_use]
pub fn price_in(amount: Decimal, currency_code: &str) -> Price {
    Price::new(
        amount,
        CurrencyCode::parse(currency_code).unwrap_or_default(),
    )
}

// =============================================================================
// Catalog Types
// =============================================================================

/// Product or variant image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Image ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Image URL.
    pub url: String,
}

/// One value of a product option (e.g., "Large").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOptionValue {
    /// Option value ID.
    pub id: String,
    /// Display value.
    pub value: String,
    /// Option this value belongs to.
    #[serde(default)]
    pub option_id: Option<String>,
}

/// Product option definition (e.g., "Size" with its values).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option ID.
    pub id: String,
    /// Option name.
    pub title: String,
    /// Available values.
    #[serde(default)]
    pub values: Vec<ProductOptionValue>,
}

/// Region-specific price computed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatedPrice {
    /// Price after price lists and sales.
    #[serde(default)]
    pub calculated_amount: Option<Decimal>,
    /// Price before price lists and sales.
    #[serde(default)]
    pub original_amount: Option<Decimal>,
    /// Lowercase ISO currency code.
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// A product variant (specific combination of option values).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title.
    #[serde(default)]
    pub title: Option<String>,
    /// SKU code.
    #[serde(default)]
    pub sku: Option<String>,
    /// Whether the backend tracks inventory for this variant.
    #[serde(default)]
    pub manage_inventory: bool,
    /// Whether the variant can be ordered when out of stock.
    #[serde(default)]
    pub allow_backorder: bool,
    /// Units available (only when requested and inventory is managed).
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    /// Option values selected by this variant.
    #[serde(default)]
    pub options: Vec<ProductOptionValue>,
    /// Region price (present when the request carried a region).
    #[serde(default)]
    pub calculated_price: Option<CalculatedPrice>,
}

impl ProductVariant {
    /// Whether the variant can be added to a cart.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        !self.manage_inventory
            || self.allow_backorder
            || self.inventory_quantity.unwrap_or(0) > 0
    }

    /// Current price in the requested region.
    #[must_use]
    pub fn price(&self) -> Option<Price> {
        let calculated = self.calculated_price.as_ref()?;
        let amount = calculated.calculated_amount?;
        Some(price_in(
            amount,
            calculated.currency_code.as_deref().unwrap_or_default(),
        ))
    }

    /// Original price, only when it is higher than the current price.
    #[must_use]
    pub fn original_price(&self) -> Option<Price> {
        let calculated = self.calculated_price.as_ref()?;
        let current = calculated.calculated_amount?;
        let original = calculated.original_amount?;
        (original > current).then(|| {
            price_in(
                original,
                calculated.currency_code.as_deref().unwrap_or_default(),
            )
        })
    }

    /// Calculated amount used for sorting; unpriced variants sort last.
    #[must_use]
    pub fn sort_amount(&self) -> Option<Decimal> {
        self.calculated_price.as_ref()?.calculated_amount
    }
}

/// Collection summary embedded in a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Collection ID.
    pub id: CollectionId,
    /// Collection title.
    pub title: String,
    /// URL handle.
    pub handle: String,
}

/// Category summary embedded in a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Category ID.
    pub id: CategoryId,
    /// Category name.
    pub name: String,
    /// URL handle.
    pub handle: String,
}

/// Product tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTag {
    /// Tag value.
    pub value: String,
}

/// A product in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// URL handle.
    pub handle: String,
    /// Subtitle.
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Plain text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// All product images.
    #[serde(default)]
    pub images: Vec<Image>,
    /// Product options.
    #[serde(default)]
    pub options: Vec<ProductOption>,
    /// Product variants.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    /// Owning collection ID.
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    /// Owning collection (when expanded).
    #[serde(default)]
    pub collection: Option<CollectionRef>,
    /// Categories (when expanded).
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<ProductTag>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Product {
    /// Find a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id.as_str() == id)
    }

    /// The variant with the lowest calculated price.
    #[must_use]
    pub fn cheapest_variant(&self) -> Option<&ProductVariant> {
        self.variants
            .iter()
            .filter(|v| v.sort_amount().is_some())
            .min_by_key(|v| v.sort_amount())
    }

    /// Lowest price across variants ("from" price on cards).
    #[must_use]
    pub fn cheapest_price(&self) -> Option<Price> {
        self.cheapest_variant().and_then(ProductVariant::price)
    }

    /// Whether any variant can be purchased.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(ProductVariant::in_stock)
    }
}

/// Paginated list of products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    /// Products in this page.
    pub products: Vec<Product>,
    /// Total matching products.
    #[serde(default)]
    pub count: u64,
    /// Offset of this page.
    #[serde(default)]
    pub offset: u64,
    /// Page size.
    #[serde(default)]
    pub limit: u64,
}

/// A collection of products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Collection ID.
    pub id: CollectionId,
    /// Collection title.
    pub title: String,
    /// URL handle.
    pub handle: String,
}

/// Paginated list of collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPage {
    /// Collections in this page.
    pub collections: Vec<Collection>,
    /// Total collections.
    #[serde(default)]
    pub count: u64,
    /// Offset of this page.
    #[serde(default)]
    pub offset: u64,
    /// Page size.
    #[serde(default)]
    pub limit: u64,
}

/// A product category (categories form a tree).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCategory {
    /// Category ID.
    pub id: CategoryId,
    /// Category name.
    pub name: String,
    /// URL handle.
    pub handle: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Parent category ID (None for top-level categories).
    #[serde(default)]
    pub parent_category_id: Option<CategoryId>,
    /// Child categories (when expanded).
    #[serde(default)]
    pub category_children: Vec<Self>,
}

/// Paginated list of categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPage {
    /// Categories in this page.
    pub product_categories: Vec<ProductCategory>,
    /// Total categories.
    #[serde(default)]
    pub count: u64,
}

/// Query for the product listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Page size.
    pub limit: u32,
    /// Number of products to skip.
    pub offset: u32,
    /// Backend sort order (e.g., `-created_at`).
    pub order: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    /// Filter by product handle.
    pub handle: Option<String>,
    /// Filter by collection IDs.
    pub collection_ids: Vec<CollectionId>,
    /// Filter by category IDs.
    pub category_ids: Vec<CategoryId>,
    /// Region used to compute prices.
    pub region_id: Option<RegionId>,
}

impl ProductQuery {
    /// Query string pairs for the Store API.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("fields", PRODUCT_FIELDS.to_string()),
        ];
        if let Some(order) = &self.order {
            pairs.push(("order", order.clone()));
        }
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(handle) = &self.handle {
            pairs.push(("handle", handle.clone()));
        }
        for id in &self.collection_ids {
            pairs.push(("collection_id[]", id.to_string()));
        }
        for id in &self.category_ids {
            pairs.push(("category_id[]", id.to_string()));
        }
        if let Some(region_id) = &self.region_id {
            pairs.push(("region_id", region_id.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Region Types
// =============================================================================

/// A country within a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code (lowercase).
    pub iso_2: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Country {
    /// Name for selectors, falling back to the uppercase code.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.iso_2.to_ascii_uppercase())
    }
}

/// A region: geographic and currency context for prices and fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Region ID.
    pub id: RegionId,
    /// Region name.
    pub name: String,
    /// Lowercase ISO currency code.
    pub currency_code: String,
    /// Countries served by this region.
    #[serde(default)]
    pub countries: Vec<Country>,
}

impl Region {
    /// Whether this region serves the given country.
    #[must_use]
    pub fn has_country(&self, code: &CountryCode) -> bool {
        self.countries.iter().any(|c| code.matches(&c.iso_2))
    }
}

// =============================================================================
// Address Types
// =============================================================================

/// A postal address as returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    /// Address ID (customer addresses only).
    #[serde(default)]
    pub id: Option<AddressId>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Default shipping address flag (customer addresses only).
    #[serde(default)]
    pub is_default_shipping: bool,
}

impl Address {
    /// Full name on the address.
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Single-line summary for lists and checkout review.
    #[must_use]
    pub fn summary(&self) -> String {
        let city_line = [self.postal_code.as_deref(), self.city.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [
            self.address_1.clone(),
            self.address_2.clone(),
            Some(city_line),
            self.province.clone(),
            self.country_code.as_deref().map(str::to_ascii_uppercase),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Copy as mutation input.
    #[must_use]
    pub fn to_input(&self) -> AddressInput {
        AddressInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            company: self.company.clone(),
            address_1: self.address_1.clone(),
            address_2: self.address_2.clone(),
            city: self.city.clone(),
            province: self.province.clone(),
            postal_code: self.postal_code.clone(),
            country_code: self.country_code.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Address payload for cart and customer mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// A line item in a cart or order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Line item ID.
    pub id: LineItemId,
    /// Product title at the time of adding.
    pub title: String,
    /// Subtitle (usually the product title when `title` is the variant).
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Quantity.
    pub quantity: u32,
    /// Price per unit.
    #[serde(default)]
    pub unit_price: Decimal,
    /// Line subtotal (before discounts).
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    /// Line total (after discounts and tax).
    #[serde(default)]
    pub total: Option<Decimal>,
    /// Variant ID.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Product ID.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Product handle for linking back.
    #[serde(default)]
    pub product_handle: Option<String>,
    /// Product title.
    #[serde(default)]
    pub product_title: Option<String>,
    /// Variant title.
    #[serde(default)]
    pub variant_title: Option<String>,
}

/// Shipping method selected on a cart or order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethod {
    /// Shipping method ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Amount charged.
    #[serde(default)]
    pub amount: Decimal,
    /// Shipping option this method was created from.
    #[serde(default)]
    pub shipping_option_id: Option<ShippingOptionId>,
}

/// A payment session with one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Session ID.
    pub id: String,
    /// Provider handling the session.
    pub provider_id: PaymentProviderId,
    /// Session status (`pending`, `authorized`, `requires_more`, ...).
    #[serde(default)]
    pub status: String,
}

/// Payment collection attached to a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCollection {
    /// Payment collection ID.
    pub id: PaymentCollectionId,
    /// Collection status.
    #[serde(default)]
    pub status: Option<String>,
    /// Sessions initiated for this collection.
    #[serde(default)]
    pub payment_sessions: Vec<PaymentSession>,
}

/// How a promotion is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationMethod {
    /// `percentage` or `fixed`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Percentage or amount.
    #[serde(default)]
    pub value: Option<Decimal>,
    /// Currency for fixed amounts.
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// A promotion applied to a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    /// Promotion ID.
    pub id: String,
    /// Code entered by the shopper (None for automatic promotions).
    #[serde(default)]
    pub code: Option<String>,
    /// Whether the backend applied it automatically.
    #[serde(default)]
    pub is_automatic: bool,
    /// Application method.
    #[serde(default)]
    pub application_method: Option<ApplicationMethod>,
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Region the cart is priced in.
    #[serde(default)]
    pub region_id: Option<RegionId>,
    /// Lowercase ISO currency code.
    #[serde(default)]
    pub currency_code: String,
    /// Owning customer, if signed in.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Line items.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Shipping address.
    #[serde(default)]
    pub shipping_address: Option<Address>,
    /// Billing address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    /// Selected shipping methods.
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    /// Payment collection.
    #[serde(default)]
    pub payment_collection: Option<PaymentCollection>,
    /// Applied promotions.
    #[serde(default)]
    pub promotions: Vec<Promotion>,
    /// Sum of line subtotals.
    #[serde(default)]
    pub item_subtotal: Decimal,
    /// Subtotal.
    #[serde(default)]
    pub subtotal: Decimal,
    /// Shipping total.
    #[serde(default)]
    pub shipping_total: Decimal,
    /// Discount total.
    #[serde(default)]
    pub discount_total: Decimal,
    /// Tax total.
    #[serde(default)]
    pub tax_total: Decimal,
    /// Grand total.
    #[serde(default)]
    pub total: Decimal,
    /// Set once the cart has been turned into an order.
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl Cart {
    /// Total item quantity (badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Format a cart amount in the cart's currency.
    #[must_use]
    pub fn money(&self, amount: Decimal) -> Price {
        price_in(amount, &self.currency_code)
    }

    /// The payment session checkout will complete with, if one was initiated.
    #[must_use]
    pub fn active_payment_session(&self) -> Option<&PaymentSession> {
        self.payment_collection
            .as_ref()?
            .payment_sessions
            .iter()
            .find(|s| matches!(s.status.as_str(), "pending" | "authorized" | "requires_more"))
    }

    /// Codes of promotions the shopper entered.
    #[must_use]
    pub fn promo_codes(&self) -> Vec<String> {
        self.promotions
            .iter()
            .filter(|p| !p.is_automatic)
            .filter_map(|p| p.code.clone())
            .collect()
    }
}

/// Input for creating a cart.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCartInput {
    /// Region to price the cart in.
    pub region_id: RegionId,
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Input for updating cart-level fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCartInput {
    /// Move the cart to another region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Shipping address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressInput>,
    /// Billing address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<AddressInput>,
}

// =============================================================================
// Checkout Types
// =============================================================================

/// How a shipping option is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingPriceType {
    /// Fixed amount known up front.
    #[default]
    Flat,
    /// Amount computed by the fulfillment provider for a cart.
    Calculated,
    #[serde(other)]
    Unknown,
}

/// A shipping option available for a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingOption {
    /// Shipping option ID.
    pub id: ShippingOptionId,
    /// Display name.
    pub name: String,
    /// Pricing model.
    #[serde(default)]
    pub price_type: ShippingPriceType,
    /// Amount (flat options, or calculated options after calculation).
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Fulfillment provider.
    #[serde(default)]
    pub provider_id: Option<String>,
    /// Whether stock at the fulfilling location is insufficient.
    #[serde(default)]
    pub insufficient_inventory: bool,
}

/// A payment provider enabled for a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProvider {
    /// Provider ID (e.g., `pp_system_default`).
    pub id: PaymentProviderId,
    /// Whether the provider is enabled.
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

impl PaymentProvider {
    /// Shopper-facing name derived from the provider ID.
    #[must_use]
    pub fn label(&self) -> String {
        match self.id.as_str() {
            "pp_system_default" => "Manual payment".to_string(),
            id if id.starts_with("pp_stripe") => "Credit card".to_string(),
            id if id.starts_with("pp_paypal") => "PayPal".to_string(),
            id => id.trim_start_matches("pp_").replace('_', " "),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Error attached to a cart that failed to complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionError {
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// Result of completing a cart.
#[derive(Debug, Clone)]
pub enum CartCompletion {
    /// The cart became an order.
    Order(Box<Order>),
    /// The cart stays a cart; `error` explains why.
    Cart {
        /// The unchanged cart.
        cart: Box<Cart>,
        /// Backend message.
        error: String,
    },
}

// =============================================================================
// Order Types
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Sequential number shown to customers.
    #[serde(default)]
    pub display_id: Option<u64>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Order status.
    #[serde(default)]
    pub status: OrderStatus,
    /// Payment status.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Fulfillment status.
    #[serde(default)]
    pub fulfillment_status: FulfillmentStatus,
    /// Lowercase ISO currency code.
    #[serde(default)]
    pub currency_code: String,
    /// Line items.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Shipping address.
    #[serde(default)]
    pub shipping_address: Option<Address>,
    /// Billing address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    /// Shipping methods.
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    /// Sum of line subtotals.
    #[serde(default)]
    pub item_subtotal: Decimal,
    /// Shipping total.
    #[serde(default)]
    pub shipping_total: Decimal,
    /// Discount total.
    #[serde(default)]
    pub discount_total: Decimal,
    /// Tax total.
    #[serde(default)]
    pub tax_total: Decimal,
    /// Grand total.
    #[serde(default)]
    pub total: Decimal,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Order {
    /// Format an order amount in the order's currency.
    #[must_use]
    pub fn money(&self, amount: Decimal) -> Price {
        price_in(amount, &self.currency_code)
    }

    /// Order number for display (`#1042`), falling back to the ID.
    #[must_use]
    pub fn number(&self) -> String {
        self.display_id
            .map_or_else(|| self.id.to_string(), |n| format!("#{n}"))
    }
}

/// Paginated list of orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    /// Orders in this page.
    pub orders: Vec<Order>,
    /// Total orders.
    #[serde(default)]
    pub count: u64,
}

// =============================================================================
// Customer Types
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID.
    pub id: CustomerId,
    /// Email.
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Saved addresses.
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl Customer {
    /// Name for greetings, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.first_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => self.email.clone(),
        }
    }

    /// The saved address flagged as default for shipping.
    #[must_use]
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default_shipping)
    }
}

/// Input for registering a customer.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterCustomerInput {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Input for updating the signed-in customer's profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCustomerInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
