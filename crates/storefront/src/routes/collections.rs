//! Collection route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::commerce::Collection;
use crate::error::Result;
use crate::filters;
use crate::middleware::Layout;
use crate::routes::products::{ListingParams, ListingView, load_listing};
use crate::state::AppState;

/// Collections listed on the index page.
const COLLECTION_LIMIT: u32 = 100;

/// Collection display data for templates.
#[derive(Clone)]
pub struct CollectionView {
    pub handle: String,
    pub title: String,
}

impl From<&Collection> for CollectionView {
    fn from(collection: &Collection) -> Self {
        Self {
            handle: collection.handle.clone(),
            title: collection.title.clone(),
        }
    }
}

/// Collection listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "collections/index.html")]
pub struct CollectionsIndexTemplate {
    pub layout: Layout,
    pub collections: Vec<CollectionView>,
}

/// Collection detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "collections/show.html")]
pub struct CollectionShowTemplate {
    pub layout: Layout,
    pub collection: CollectionView,
    pub listing: ListingView,
}

/// Display all collections.
#[instrument(skip(state, layout))]
pub async fn index(State(state): State<AppState>, layout: Layout) -> Result<impl IntoResponse> {
    let page = state.store().list_collections(COLLECTION_LIMIT, 0).await?;

    Ok(CollectionsIndexTemplate {
        layout,
        collections: page.collections.iter().map(CollectionView::from).collect(),
    })
}

/// Display a collection's products.
#[instrument(skip(state, session, layout, params), fields(handle = %handle))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Path(handle): Path<String>,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let collection = state.store().collection_by_handle(&handle).await?;

    let listing = load_listing(
        &state,
        &session,
        &params,
        vec![collection.id.clone()],
        Vec::new(),
        &format!("/collections/{handle}"),
    )
    .await?;

    Ok(CollectionShowTemplate {
        layout,
        collection: CollectionView::from(&collection),
        listing,
    })
}
