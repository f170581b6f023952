//! Store API client implementation.
//!
//! Plain JSON over `reqwest` 0.13. Catalog reads (products, collections,
//! categories, regions) are cached with `moka`; carts and customer data are not.

mod cache;
mod cart;
mod customer;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::commerce::types::{
    Collection, CollectionPage, Product, ProductCategory, ProductPage, ProductQuery, Region,
};
use crate::commerce::{ApiErrorBody, CommerceError};
use crate::config::CommerceConfig;

use cache::{CacheKey, CacheValue};
pub use customer::CustomerSession;
use harbor_core::RegionId;

/// Header carrying the publishable API key on every request.
const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// Maximum number of body characters written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Response envelopes
// =============================================================================

#[derive(serde::Deserialize)]
struct RegionsResponse {
    regions: Vec<Region>,
}

#[derive(serde::Deserialize)]
struct CategoriesResponse {
    product_categories: Vec<ProductCategory>,
}

// =============================================================================
// StoreClient
// =============================================================================

/// Client for the commerce backend's Store API.
///
/// Cheap to clone; all clones share one connection pool and one cache.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<StoreClientInner>,
}

struct StoreClientInner {
    client: reqwest::Client,
    base_url: String,
    publishable_key: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl StoreClient {
    /// Create a new Store API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CommerceConfig) -> Result<Self, CommerceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("harbor-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(StoreClientInner {
                client,
                base_url: config.backend_url.as_str().trim_end_matches('/').to_string(),
                publishable_key: config.publishable_key.clone(),
                cache,
            }),
        })
    }

    /// Absolute URL for a backend path such as `/store/products`.
    fn endpoint(&self, path: &str) -> Result<Url, CommerceError> {
        Ok(Url::parse(&format!("{}{path}", self.inner.base_url))?)
    }

    /// Start a request with the publishable key and optional customer token.
    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder, CommerceError> {
        let mut request = self
            .inner
            .client
            .request(method, self.endpoint(path)?)
            .header(PUBLISHABLE_KEY_HEADER, &self.inner.publishable_key);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<T, CommerceError> {
        let request = self.request(Method::GET, path, token)?.query(query);
        self.execute(request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, CommerceError> {
        let request = self.request(Method::POST, path, token)?.json(body);
        self.execute(request).await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<T, CommerceError> {
        let mut request = self.request(Method::DELETE, path, token)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }

    /// Send a request and decode the JSON response.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, CommerceError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        // Read as text first so failures can log what the backend said
        let response_text = response.text().await?;

        if !status.is_success() {
            let body: ApiErrorBody = serde_json::from_str(&response_text).unwrap_or_default();
            let message = if body.message.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.message
            };

            if status == StatusCode::NOT_FOUND {
                debug!(message = %message, "Store API resource not found");
                return Err(CommerceError::NotFound(message));
            }

            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %truncate(&response_text),
                    "Store API returned server error"
                );
            } else {
                tracing::warn!(
                    status = %status,
                    kind = ?body.kind,
                    message = %message,
                    "Store API rejected request"
                );
            }

            return Err(CommerceError::Api {
                status: status.as_u16(),
                kind: body.kind,
                message,
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse Store API response"
            );
            CommerceError::Parse(e)
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List products. Results without a search term are cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(limit = query.limit, offset = query.offset))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CommerceError> {
        let cacheable = query.q.is_none();
        let cache_key = CacheKey::Products(query.clone());

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page: ProductPage = self
            .get("/store/products", &query.to_query_pairs(), None)
            .await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by its handle, priced for a region.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no product has this handle, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn product_by_handle(
        &self,
        handle: &str,
        region_id: Option<&RegionId>,
    ) -> Result<Product, CommerceError> {
        let cache_key = CacheKey::Product {
            handle: handle.to_string(),
            region_id: region_id.map(ToString::to_string),
        };

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let query = ProductQuery {
            limit: 1,
            handle: Some(handle.to_string()),
            region_id: region_id.cloned(),
            ..ProductQuery::default()
        };
        let page: ProductPage = self
            .get("/store/products", &query.to_query_pairs(), None)
            .await?;

        let product = page
            .products
            .into_iter()
            .next()
            .ok_or_else(|| CommerceError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Collection Methods
    // =========================================================================

    /// List collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_collections(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<CollectionPage, CommerceError> {
        let cache_key = CacheKey::Collections { limit, offset };

        if let Some(CacheValue::Collections(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for collections");
            return Ok(page);
        }

        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let page: CollectionPage = self.get("/store/collections", &query, None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Collections(page.clone()))
            .await;

        Ok(page)
    }

    /// Get a collection by its handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no collection has this handle, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn collection_by_handle(&self, handle: &str) -> Result<Collection, CommerceError> {
        let cache_key = CacheKey::Collection(handle.to_string());

        if let Some(CacheValue::Collection(collection)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let query = [("handle", handle.to_string()), ("limit", "1".to_string())];
        let page: CollectionPage = self.get("/store/collections", &query, None).await?;

        let collection = page
            .collections
            .into_iter()
            .next()
            .ok_or_else(|| CommerceError::NotFound(format!("Collection not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Collection(Box::new(collection.clone())))
            .await;

        Ok(collection)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List top-level categories with their descendants.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<ProductCategory>, CommerceError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let query = [
            ("parent_category_id", "null".to_string()),
            ("include_descendants_tree", "true".to_string()),
            ("limit", "100".to_string()),
        ];
        let response: CategoriesResponse =
            self.get("/store/product-categories", &query, None).await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(response.product_categories.clone()),
            )
            .await;

        Ok(response.product_categories)
    }

    /// Get a category by its handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no category has this handle, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn category_by_handle(&self, handle: &str) -> Result<ProductCategory, CommerceError> {
        let cache_key = CacheKey::Category(handle.to_string());

        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let query = [
            ("handle", handle.to_string()),
            ("include_descendants_tree", "true".to_string()),
            ("limit", "1".to_string()),
        ];
        let response: CategoriesResponse =
            self.get("/store/product-categories", &query, None).await?;

        let category = response
            .product_categories
            .into_iter()
            .next()
            .ok_or_else(|| CommerceError::NotFound(format!("Category not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Category(Box::new(category.clone())))
            .await;

        Ok(category)
    }

    // =========================================================================
    // Region Methods
    // =========================================================================

    /// List all regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_regions(&self) -> Result<Vec<Region>, CommerceError> {
        if let Some(CacheValue::Regions(regions)) = self.inner.cache.get(&CacheKey::Regions).await
        {
            debug!("Cache hit for regions");
            return Ok(regions);
        }

        let response: RegionsResponse = self.get("/store/regions", &[], None).await?;

        self.inner
            .cache
            .insert(CacheKey::Regions, CacheValue::Regions(response.regions.clone()))
            .await;

        Ok(response.regions)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop every cached catalog response.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Truncate a response body for logging.
fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    /// Serve `router` on an ephemeral port and return a client pointed at it.
    pub(crate) async fn client_for(router: Router) -> StoreClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}")).unwrap();
        StoreClient::new(&CommerceConfig::new(url, "pk_test")).unwrap()
    }

    fn product_json(handle: &str) -> serde_json::Value {
        json!({
            "id": format!("prod_{handle}"),
            "title": handle,
            "handle": handle,
            "variants": []
        })
    }

    #[tokio::test]
    async fn test_sends_publishable_key() {
        let router = Router::new().route(
            "/store/regions",
            get(|headers: HeaderMap| async move {
                let key = headers
                    .get(PUBLISHABLE_KEY_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "regions": [{"id": key, "name": "Keyed", "currency_code": "usd"}]
                }))
            }),
        );
        let client = client_for(router).await;

        let regions = client.list_regions().await.unwrap();
        assert_eq!(regions[0].id.as_str(), "pk_test");
    }

    #[tokio::test]
    async fn test_product_by_handle_caches_per_region() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/store/products",
            get(
                move |Query(params): Query<Vec<(String, String)>>| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let handle = params
                            .iter()
                            .find(|(k, _)| k == "handle")
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default();
                        Json(json!({"products": [product_json(&handle)], "count": 1}))
                    }
                },
            ),
        );
        let client = client_for(router).await;
        let us = RegionId::new("reg_us");
        let eu = RegionId::new("reg_eu");

        client.product_by_handle("tee", Some(&us)).await.unwrap();
        client.product_by_handle("tee", Some(&us)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        client.product_by_handle("tee", Some(&eu)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        client.invalidate_catalog().await;
        client.product_by_handle("tee", Some(&us)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_search_results_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/store/products",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"products": [], "count": 0}))
                }
            }),
        );
        let client = client_for(router).await;
        let query = ProductQuery {
            limit: 12,
            q: Some("linen".to_string()),
            ..ProductQuery::default()
        };

        client.list_products(&query).await.unwrap();
        client.list_products(&query).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let router = Router::new().route(
            "/store/products",
            get(|| async { Json(json!({"products": [], "count": 0})) }),
        );
        let client = client_for(router).await;

        let err = client.product_by_handle("ghost", None).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_error_body_maps_to_api_error() {
        let router = Router::new().route(
            "/store/collections",
            get(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(json!({"type": "invalid_data", "message": "limit must be positive"})),
                )
                    .into_response()
            }),
        );
        let client = client_for(router).await;

        let err = client.list_collections(0, 0).await.unwrap_err();
        match err {
            CommerceError::Api {
                status,
                kind,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(kind.as_deref(), Some("invalid_data"));
                assert_eq!(message, "limit must be positive");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let router = Router::new().route(
            "/store/regions",
            get(|| async {
                (
                    axum::http::StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", "7")],
                    "slow down",
                )
                    .into_response()
            }),
        );
        let client = client_for(router).await;

        let err = client.list_regions().await.unwrap_err();
        assert!(matches!(err, CommerceError::RateLimited(7)));
    }

    #[test]
    fn test_truncate_limits_length() {
        let long = "x".repeat(LOG_BODY_LIMIT * 2);
        assert_eq!(truncate(&long).len(), LOG_BODY_LIMIT);
        assert_eq!(truncate("short"), "short");
    }
}
