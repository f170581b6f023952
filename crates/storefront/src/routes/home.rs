//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::commerce::ProductQuery;
use crate::error::Result;
use crate::filters;
use crate::middleware::Layout;
use crate::routes::products::ProductCardView;
use crate::services::region;
use crate::state::AppState;

/// Collections featured on the home page.
const FEATURED_COLLECTIONS: u32 = 3;

/// Products shown per featured collection.
const PRODUCTS_PER_COLLECTION: u32 = 4;

/// A collection rail on the home page.
#[derive(Clone)]
pub struct FeaturedCollection {
    pub handle: String,
    pub title: String,
    pub products: Vec<ProductCardView>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<FeaturedCollection>,
    pub latest: Vec<ProductCardView>,
}

/// Display the home page.
///
/// A collection whose products fail to load is skipped rather than failing
/// the whole page.
#[instrument(skip(state, session, layout))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let region = region::current_region(&state, &session).await?;
    let store = state.store();

    let collections = store.list_collections(FEATURED_COLLECTIONS, 0).await?;

    let mut featured = Vec::with_capacity(collections.collections.len());
    for collection in collections.collections {
        let query = ProductQuery {
            limit: PRODUCTS_PER_COLLECTION,
            collection_ids: vec![collection.id.clone()],
            region_id: Some(region.id.clone()),
            ..ProductQuery::default()
        };
        match store.list_products(&query).await {
            Ok(page) if !page.products.is_empty() => featured.push(FeaturedCollection {
                handle: collection.handle,
                title: collection.title,
                products: page.products.iter().map(ProductCardView::from).collect(),
            }),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(collection = %collection.handle, error = %e, "Failed to load featured collection");
            }
        }
    }

    let latest_query = ProductQuery {
        limit: PRODUCTS_PER_COLLECTION,
        order: Some("-created_at".to_string()),
        region_id: Some(region.id),
        ..ProductQuery::default()
    };
    let latest = store
        .list_products(&latest_query)
        .await?
        .products
        .iter()
        .map(ProductCardView::from)
        .collect();

    Ok(HomeTemplate {
        layout,
        featured,
        latest,
    })
}
