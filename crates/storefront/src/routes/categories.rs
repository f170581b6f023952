//! Product category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::commerce::ProductCategory;
use crate::error::Result;
use crate::filters;
use crate::middleware::Layout;
use crate::routes::products::{ListingParams, ListingView, load_listing};
use crate::state::AppState;

/// Category display data, with its subcategories.
#[derive(Clone)]
pub struct CategoryView {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub children: Vec<CategoryView>,
}

impl From<&ProductCategory> for CategoryView {
    fn from(category: &ProductCategory) -> Self {
        Self {
            handle: category.handle.clone(),
            name: category.name.clone(),
            description: category.description.clone().filter(|d| !d.trim().is_empty()),
            children: category.category_children.iter().map(Self::from).collect(),
        }
    }
}

/// Category listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryView>,
}

/// Category detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/show.html")]
pub struct CategoryShowTemplate {
    pub layout: Layout,
    pub category: CategoryView,
    pub listing: ListingView,
}

/// Display the top-level categories and their children.
#[instrument(skip(state, layout))]
pub async fn index(State(state): State<AppState>, layout: Layout) -> Result<impl IntoResponse> {
    let categories = state.store().list_categories().await?;

    Ok(CategoriesIndexTemplate {
        layout,
        categories: categories.iter().map(CategoryView::from).collect(),
    })
}

/// Display a category's products.
#[instrument(skip(state, session, layout, params), fields(handle = %handle))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Path(handle): Path<String>,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let category = state.store().category_by_handle(&handle).await?;

    let listing = load_listing(
        &state,
        &session,
        &params,
        Vec::new(),
        vec![category.id.clone()],
        &format!("/categories/{handle}"),
    )
    .await?;

    Ok(CategoryShowTemplate {
        layout,
        category: CategoryView::from(&category),
        listing,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_category_view_keeps_children() {
        let category: ProductCategory = serde_json::from_value(json!({
            "id": "pcat_1",
            "name": "Shirts",
            "handle": "shirts",
            "description": "  ",
            "category_children": [
                {"id": "pcat_2", "name": "Linen", "handle": "linen-shirts"}
            ]
        }))
        .unwrap();

        let view = CategoryView::from(&category);
        assert_eq!(view.description, None);
        assert_eq!(view.children.len(), 1);
        assert_eq!(view.children[0].handle, "linen-shirts");
    }
}
