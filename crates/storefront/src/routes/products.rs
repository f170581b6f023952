//! Product listing and detail route handlers.
//!
//! The listing keeps its filter state (page, sort, collection, category,
//! search) in the URL query string so links and reloads preserve it.

use std::cmp::Ordering;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{CategoryId, CollectionId};

use crate::commerce::{CommerceError, Product, ProductPage, ProductQuery, ProductVariant};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::Layout;
use crate::services::region;
use crate::state::AppState;

/// Products per listing page.
pub const PAGE_SIZE: u32 = 12;

/// Related products shown on a product page.
const RELATED_LIMIT: usize = 4;

// =============================================================================
// Listing State
// =============================================================================

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    CreatedAt,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
}

impl SortOrder {
    /// All orders, in selector order.
    pub const ALL: [Self; 3] = [Self::CreatedAt, Self::PriceAsc, Self::PriceDesc];

    /// Parse the query string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created_at" => Some(Self::CreatedAt),
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            _ => None,
        }
    }

    /// Query string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }

    /// Selector label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreatedAt => "Latest arrivals",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
        }
    }
}

/// Listing filters as they appear in the URL query string.
///
/// Every field is kept as raw text so a malformed value degrades to the
/// default instead of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingParams {
    pub page: Option<String>,
    pub sort: Option<String>,
    pub collection: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ListingParams {
    /// Current page (1-based).
    #[must_use]
    pub fn page(&self) -> u32 {
        non_empty(self.page.as_ref())
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }

    /// Requested sort order.
    #[must_use]
    pub fn sort(&self) -> SortOrder {
        non_empty(self.sort.as_ref())
            .and_then(SortOrder::parse)
            .unwrap_or_default()
    }

    /// Collection handle filter.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        non_empty(self.collection.as_ref())
    }

    /// Category handle filter.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        non_empty(self.category.as_ref())
    }

    /// Search term.
    #[must_use]
    pub fn q(&self) -> Option<&str> {
        non_empty(self.q.as_ref())
    }

    /// Query string for `page` with the current filters (empty when all
    /// values are defaults).
    #[must_use]
    pub fn query_string(&self, page: u32) -> String {
        self.encode(page, self.sort())
    }

    /// Query string for a different sort order, back on the first page.
    #[must_use]
    pub fn with_sort(&self, sort: SortOrder) -> String {
        self.encode(1, sort)
    }

    fn encode(&self, page: u32, sort: SortOrder) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if page > 1 {
            serializer.append_pair("page", &page.to_string());
        }
        if sort != SortOrder::default() {
            serializer.append_pair("sort", sort.as_str());
        }
        if let Some(collection) = self.collection() {
            serializer.append_pair("collection", collection);
        }
        if let Some(category) = self.category() {
            serializer.append_pair("category", category);
        }
        if let Some(q) = self.q() {
            serializer.append_pair("q", q);
        }
        let encoded = serializer.finish();
        if encoded.is_empty() {
            String::new()
        } else {
            format!("?{encoded}")
        }
    }
}

/// Order a fetched page by each product's cheapest calculated price.
///
/// Products without a price sort last in both directions.
pub fn sort_by_price(products: &mut [Product], sort: SortOrder) {
    let descending = match sort {
        SortOrder::CreatedAt => return,
        SortOrder::PriceAsc => false,
        SortOrder::PriceDesc => true,
    };

    products.sort_by(|a, b| {
        let a = a.cheapest_variant().and_then(ProductVariant::sort_amount);
        let b = b.cheapest_variant().and_then(ProductVariant::sort_amount);
        match (a, b) {
            (Some(a), Some(b)) if descending => b.cmp(&a),
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

// =============================================================================
// View Types
// =============================================================================

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub handle: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        let cheapest = product.cheapest_variant();
        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            thumbnail: product
                .thumbnail
                .clone()
                .or_else(|| product.images.first().map(|i| i.url.clone())),
            price: cheapest.and_then(ProductVariant::price).map(|p| p.display()),
            original_price: cheapest
                .and_then(ProductVariant::original_price)
                .map(|p| p.display()),
            in_stock: product.in_stock(),
        }
    }
}

/// Link in the sort selector.
#[derive(Clone)]
pub struct SortLink {
    pub label: &'static str,
    pub href: String,
    pub selected: bool,
}

/// A page of products plus pagination and sort links.
#[derive(Clone)]
pub struct ListingView {
    pub products: Vec<ProductCardView>,
    pub count: u64,
    pub page: u32,
    pub total_pages: u32,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
    pub sort_links: Vec<SortLink>,
}

impl ListingView {
    /// Build the view for a fetched page. Links are relative to `base_path`.
    #[must_use]
    pub fn new(mut page: ProductPage, params: &ListingParams, base_path: &str) -> Self {
        let current = params.page();
        let sort = params.sort();
        sort_by_price(&mut page.products, sort);

        let total_pages =
            u32::try_from(page.count.div_ceil(u64::from(PAGE_SIZE))).unwrap_or(u32::MAX).max(1);

        Self {
            products: page.products.iter().map(ProductCardView::from).collect(),
            count: page.count,
            page: current,
            total_pages,
            prev_link: (current > 1)
                .then(|| format!("{base_path}{}", params.query_string(current - 1))),
            next_link: (current < total_pages)
                .then(|| format!("{base_path}{}", params.query_string(current + 1))),
            sort_links: SortOrder::ALL
                .iter()
                .map(|&order| SortLink {
                    label: order.label(),
                    href: format!("{base_path}{}", params.with_sort(order)),
                    selected: order == sort,
                })
                .collect(),
        }
    }
}

/// Filter choice (collection or category) on the store page.
#[derive(Clone)]
pub struct FilterOption {
    pub handle: String,
    pub title: String,
    pub selected: bool,
}

/// Variant choice on the product page.
#[derive(Clone)]
pub struct VariantView {
    pub id: String,
    pub title: String,
    pub price: Option<String>,
    pub in_stock: bool,
    pub selected: bool,
    pub href: String,
}

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductDetailView {
    pub handle: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub collection_title: Option<String>,
    pub collection_handle: Option<String>,
    pub tags: Vec<String>,
}

impl From<&Product> for ProductDetailView {
    fn from(product: &Product) -> Self {
        let mut images: Vec<String> = product.images.iter().map(|i| i.url.clone()).collect();
        if images.is_empty()
            && let Some(thumbnail) = &product.thumbnail
        {
            images.push(thumbnail.clone());
        }

        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            subtitle: product.subtitle.clone(),
            description: product.description.clone(),
            images,
            collection_title: product.collection.as_ref().map(|c| c.title.clone()),
            collection_handle: product.collection.as_ref().map(|c| c.handle.clone()),
            tags: product.tags.iter().map(|t| t.value.clone()).collect(),
        }
    }
}

/// Purchase panel state for the selected variant.
#[derive(Clone)]
pub struct PurchaseView {
    /// Variant to add; `None` until the shopper picks one.
    pub variant_id: Option<String>,
    /// Price shown ("From" price until a variant is selected).
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub from_price: bool,
    pub in_stock: bool,
}

/// Product page link with `variant` selected.
#[must_use]
pub fn variant_href(handle: &str, variant: &str) -> String {
    // form_urlencoded writes spaces as '+', which a path does not decode
    let segment: String = url::form_urlencoded::byte_serialize(handle.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("variant", variant);
    format!("/products/{segment}?{}", query.finish())
}

/// Pick the variant to show: the requested one, or the only one.
#[must_use]
pub fn selected_variant<'a>(product: &'a Product, requested: Option<&str>) -> Option<&'a ProductVariant> {
    match requested {
        Some(id) => product.variant(id),
        None if product.variants.len() == 1 => product.variants.first(),
        None => None,
    }
}

impl PurchaseView {
    fn new(product: &Product, selected: Option<&ProductVariant>) -> Self {
        match selected {
            Some(variant) => Self {
                variant_id: Some(variant.id.to_string()),
                price: variant.price().map(|p| p.display()),
                original_price: variant.original_price().map(|p| p.display()),
                from_price: false,
                in_stock: variant.in_stock(),
            },
            None => Self {
                variant_id: None,
                price: product.cheapest_price().map(|p| p.display()),
                original_price: None,
                from_price: product.variants.len() > 1,
                in_stock: product.in_stock(),
            },
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Store (product listing) page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct StoreTemplate {
    pub layout: Layout,
    pub heading: String,
    pub search_query: String,
    pub sort: &'static str,
    pub listing: ListingView,
    pub collections: Vec<FilterOption>,
    pub categories: Vec<FilterOption>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetailView,
    pub variants: Vec<VariantView>,
    pub purchase: PurchaseView,
    pub related: Vec<ProductCardView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Fetch one listing page priced for the visitor's region.
///
/// # Errors
///
/// Returns an error if the region or the products cannot be loaded.
pub async fn load_listing(
    state: &AppState,
    session: &Session,
    params: &ListingParams,
    collection_ids: Vec<CollectionId>,
    category_ids: Vec<CategoryId>,
    base_path: &str,
) -> Result<ListingView> {
    let region = region::current_region(state, session).await?;
    let query = ProductQuery {
        limit: PAGE_SIZE,
        offset: (params.page() - 1).saturating_mul(PAGE_SIZE),
        order: Some("-created_at".to_string()),
        q: params.q().map(str::to_string),
        handle: None,
        collection_ids,
        category_ids,
        region_id: Some(region.id),
    };
    let page = state.store().list_products(&query).await?;
    Ok(ListingView::new(page, params, base_path))
}

/// Resolve an optional handle filter to an ID; unknown handles match nothing.
async fn resolve_filter<T, F, Fut>(handle: Option<&str>, lookup: F) -> Result<Option<T>>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = std::result::Result<T, CommerceError>>,
{
    let Some(handle) = handle else {
        return Ok(None);
    };
    match lookup(handle.to_string()).await {
        Ok(id) => Ok(Some(id)),
        Err(CommerceError::NotFound(_)) => {
            tracing::debug!(handle = %handle, "Ignoring unknown listing filter");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the product listing (`/store`).
#[instrument(skip(state, session, layout))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let store = state.store();

    let collection_id = resolve_filter(params.collection(), |handle| async move {
        store.collection_by_handle(&handle).await.map(|c| c.id)
    })
    .await?;
    let category_id = resolve_filter(params.category(), |handle| async move {
        store.category_by_handle(&handle).await.map(|c| c.id)
    })
    .await?;

    let listing = load_listing(
        &state,
        &session,
        &params,
        collection_id.into_iter().collect(),
        category_id.into_iter().collect(),
        "/store",
    )
    .await?;

    let collections = store
        .list_collections(100, 0)
        .await?
        .collections
        .into_iter()
        .map(|c| FilterOption {
            selected: params.collection() == Some(c.handle.as_str()),
            handle: c.handle,
            title: c.title,
        })
        .collect();
    let categories = store
        .list_categories()
        .await?
        .into_iter()
        .map(|c| FilterOption {
            selected: params.category() == Some(c.handle.as_str()),
            handle: c.handle,
            title: c.name,
        })
        .collect();

    let heading = params
        .q()
        .map_or_else(|| "All products".to_string(), |q| format!("Results for \u{201c}{q}\u{201d}"));

    Ok(StoreTemplate {
        layout,
        heading,
        search_query: params.q().unwrap_or_default().to_string(),
        sort: params.sort().as_str(),
        listing,
        collections,
        categories,
    })
}

/// Search entry point: forwards to the listing with the same filters.
pub async fn search(Query(params): Query<ListingParams>) -> Redirect {
    Redirect::to(&format!("/store{}", params.query_string(1)))
}

/// Query parameters for the product page.
#[derive(Debug, Deserialize)]
pub struct ProductQueryParams {
    pub variant: Option<String>,
}

/// Display the product detail page.
#[instrument(skip(state, session, layout, params), fields(handle = %handle))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Path(handle): Path<String>,
    Query(params): Query<ProductQueryParams>,
) -> Result<impl IntoResponse> {
    let region = region::current_region(&state, &session).await?;
    let product = state
        .store()
        .product_by_handle(&handle, Some(&region.id))
        .await?;

    let requested = params.variant.as_deref().filter(|v| !v.is_empty());
    let selected = selected_variant(&product, requested);
    if requested.is_some() && selected.is_none() {
        return Err(AppError::NotFound(format!("variant of {handle}")));
    }

    let variants = product
        .variants
        .iter()
        .map(|v| VariantView {
            id: v.id.to_string(),
            title: v.title.clone().unwrap_or_else(|| "Default".to_string()),
            price: v.price().map(|p| p.display()),
            in_stock: v.in_stock(),
            selected: selected.is_some_and(|s| s.id == v.id),
            href: variant_href(&product.handle, v.id.as_str()),
        })
        .collect();

    let related = match &product.collection_id {
        Some(collection_id) => {
            let query = ProductQuery {
                limit: u32::try_from(RELATED_LIMIT + 1).unwrap_or(u32::MAX),
                collection_ids: vec![collection_id.clone()],
                region_id: Some(region.id.clone()),
                ..ProductQuery::default()
            };
            match state.store().list_products(&query).await {
                Ok(page) => page
                    .products
                    .iter()
                    .filter(|p| p.id != product.id)
                    .take(RELATED_LIMIT)
                    .map(ProductCardView::from)
                    .collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load related products");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    Ok(ProductShowTemplate {
        layout,
        purchase: PurchaseView::new(&product, selected),
        product: ProductDetailView::from(&product),
        variants,
        related,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use axum::http::Uri;
    use serde_json::json;

    use super::*;

    fn params(uri: &str) -> ListingParams {
        let uri: Uri = uri.parse().unwrap();
        Query::<ListingParams>::try_from_uri(&uri).unwrap().0
    }

    fn product(handle: &str, amounts: &[Option<f64>]) -> Product {
        serde_json::from_value(json!({
            "id": format!("prod_{handle}"),
            "title": handle,
            "handle": handle,
            "variants": amounts.iter().enumerate().map(|(i, a)| json!({
                "id": format!("var_{handle}_{i}"),
                "title": format!("V{i}"),
                "calculated_price": a.map(|a| json!({
                    "calculated_amount": a,
                    "original_amount": a,
                    "currency_code": "usd"
                }))
            })).collect::<Vec<_>>()
        }))
        .unwrap()
    }

    #[test]
    fn test_listing_params_round_trip() {
        let original = params("/store?page=3&sort=price_desc&collection=summer&q=linen%20shirt");
        assert_eq!(original.page(), 3);
        assert_eq!(original.sort(), SortOrder::PriceDesc);
        assert_eq!(original.collection(), Some("summer"));
        assert_eq!(original.q(), Some("linen shirt"));

        let reparsed = params(&format!("/store{}", original.query_string(3)));
        assert_eq!(reparsed.page(), 3);
        assert_eq!(reparsed.sort(), SortOrder::PriceDesc);
        assert_eq!(reparsed.collection(), Some("summer"));
        assert_eq!(reparsed.category(), None);
        assert_eq!(reparsed.q(), Some("linen shirt"));
    }

    #[test]
    fn test_listing_params_defaults_are_omitted() {
        let p = params("/store?page=1&sort=created_at&q=");
        assert_eq!(p.query_string(1), "");
        assert_eq!(p.query_string(2), "?page=2");
    }

    #[test]
    fn test_listing_params_tolerate_garbage() {
        let p = params("/store?page=abc&sort=cheapest");
        assert_eq!(p.page(), 1);
        assert_eq!(p.sort(), SortOrder::CreatedAt);

        assert_eq!(params("/store?page=0").page(), 1);
    }

    #[test]
    fn test_with_sort_resets_page() {
        let p = params("/store?page=4&category=shirts");
        assert_eq!(
            p.with_sort(SortOrder::PriceAsc),
            "?sort=price_asc&category=shirts"
        );
    }

    #[test]
    fn test_sort_by_price() {
        let mut products = vec![
            product("mid", &[Some(20.0)]),
            product("unpriced", &[None]),
            product("cheap", &[Some(30.0), Some(5.0)]),
            product("dear", &[Some(50.0)]),
        ];

        sort_by_price(&mut products, SortOrder::PriceAsc);
        let handles: Vec<_> = products.iter().map(|p| p.handle.as_str()).collect();
        assert_eq!(handles, ["cheap", "mid", "dear", "unpriced"]);

        sort_by_price(&mut products, SortOrder::PriceDesc);
        let handles: Vec<_> = products.iter().map(|p| p.handle.as_str()).collect();
        assert_eq!(handles, ["dear", "mid", "cheap", "unpriced"]);
    }

    #[test]
    fn test_listing_view_pagination_links() {
        let page = ProductPage {
            products: vec![product("a", &[Some(1.0)])],
            count: 30,
            offset: 12,
            limit: 12,
        };
        let view = ListingView::new(page, &params("/store?page=2&sort=price_asc"), "/store");

        assert_eq!(view.total_pages, 3);
        assert_eq!(view.prev_link.as_deref(), Some("/store?sort=price_asc"));
        assert_eq!(view.next_link.as_deref(), Some("/store?page=3&sort=price_asc"));
        assert!(view.sort_links[1].selected);
    }

    #[test]
    fn test_selected_variant() {
        let single = product("single", &[Some(10.0)]);
        assert_eq!(
            selected_variant(&single, None).unwrap().id.as_str(),
            "var_single_0"
        );

        let multi = product("multi", &[Some(10.0), Some(12.0)]);
        assert!(selected_variant(&multi, None).is_none());
        assert_eq!(
            selected_variant(&multi, Some("var_multi_1")).unwrap().id.as_str(),
            "var_multi_1"
        );
        assert!(selected_variant(&multi, Some("var_other")).is_none());
    }

    #[test]
    fn test_variant_href_encodes_handle_and_id() {
        assert_eq!(
            variant_href("linen-shirt", "var_shirt_m"),
            "/products/linen-shirt?variant=var_shirt_m"
        );
        assert_eq!(
            variant_href("tee & tote/2", "var a+b"),
            "/products/tee%20%26%20tote%2F2?variant=var+a%2Bb"
        );
    }

    #[test]
    fn test_purchase_view_from_price() {
        let multi = product("multi", &[Some(10.0), Some(12.0)]);
        let purchase = PurchaseView::new(&multi, None);
        assert!(purchase.from_price);
        assert!(purchase.variant_id.is_none());
        assert_eq!(purchase.price.as_deref(), Some("$10.00"));
    }
}
