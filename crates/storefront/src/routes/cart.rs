//! Cart route handlers.
//!
//! Add-to-cart is driven by HTMX from product pages: it answers with the
//! badge fragment and an `HX-Trigger` so other widgets refresh. The cart page
//! mutations accept either HTMX (items fragment) or plain form posts
//! (redirect back to `/cart`). The badge always reflects the cart the backend
//! returned, never a locally computed count.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{LineItemId, VariantId};

use crate::commerce::{Cart, LineItem};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{auth::is_safe_redirect, flash::push_toast, Layout};
use crate::models::Toast;
use crate::services::cart::{self as cart_service, remember_cart};
use crate::state::AppState;

/// Event name clients listen on to refresh cart widgets.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Toast shown when the backend no longer has the session's cart.
const CART_EXPIRED: &str = "Your cart has expired. Please add your items again.";

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

// =============================================================================
// View Types
// =============================================================================

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub handle: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl CartItemView {
    fn new(cart: &Cart, item: &LineItem) -> Self {
        let line_total = item
            .total
            .or(item.subtotal)
            .unwrap_or_else(|| item.unit_price * Decimal::from(item.quantity));

        Self {
            id: item.id.to_string(),
            handle: item.product_handle.clone(),
            title: item
                .product_title
                .clone()
                .unwrap_or_else(|| item.title.clone()),
            variant_title: item
                .variant_title
                .clone()
                .filter(|t| !t.is_empty() && t != "Default"),
            thumbnail: item.thumbnail.clone(),
            quantity: item.quantity,
            unit_price: cart.money(item.unit_price).display(),
            line_total: cart.money(line_total).display(),
        }
    }
}

/// Cart display data for templates. Totals come from the backend.
#[derive(Clone, Default)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: Option<String>,
    pub tax: Option<String>,
    pub total: String,
    pub promo_codes: Vec<String>,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let nonzero = |amount: Decimal| (!amount.is_zero()).then(|| cart.money(amount).display());

        Self {
            items: cart.items.iter().map(|i| CartItemView::new(cart, i)).collect(),
            item_count: cart.item_count(),
            subtotal: cart.money(cart.item_subtotal).display(),
            discount: nonzero(cart.discount_total),
            shipping: (!cart.shipping_methods.is_empty())
                .then(|| cart.money(cart.shipping_total).display()),
            tax: nonzero(cart.tax_total),
            total: cart.money(cart.total).display(),
            promo_codes: cart.promo_codes(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: String,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Update cart item form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove cart item form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Promotion code form data.
#[derive(Debug, Deserialize)]
pub struct PromotionForm {
    pub code: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Response for a failed mutation. The toast is already in the session.
///
/// HTMX requests refresh the page so the toast renders.
fn failure_response(htmx: bool, target: &str) -> Response {
    if htmx {
        AppendHeaders([("HX-Refresh", "true")]).into_response()
    } else {
        Redirect::to(target).into_response()
    }
}

/// Message for a failed cart mutation.
///
/// A cart the backend no longer has is dropped from the session, so the badge
/// resets with it.
async fn mutation_failure_message(state: &AppState, session: &Session, error: &AppError) -> String {
    match cart_service::drop_if_stale(state, session, error).await {
        Ok(true) => CART_EXPIRED.to_string(),
        Ok(false) => error.user_message(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to recheck cart");
            error.user_message()
        }
    }
}

/// Store the cart the backend returned and answer the cart page.
async fn finish_mutation(
    state: &AppState,
    session: &Session,
    htmx: bool,
    result: std::result::Result<Cart, AppError>,
) -> Result<Response> {
    match result {
        Ok(cart) => {
            remember_cart(session, &cart).await?;
            if htmx {
                Ok((
                    AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]),
                    CartItemsTemplate {
                        cart: CartView::from(&cart),
                    },
                )
                    .into_response())
            } else {
                Ok(Redirect::to("/cart").into_response())
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cart update failed");
            let message = mutation_failure_message(state, session, &e).await;
            push_toast(session, Toast::error(message)).await;
            Ok(failure_response(htmx, "/cart"))
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
) -> Result<impl IntoResponse> {
    let cart = match cart_service::load_cart(&state, &session).await? {
        Some(cart) => {
            layout.cart_count = cart.item_count();
            CartView::from(&cart)
        }
        None => {
            layout.cart_count = 0;
            CartView::empty()
        }
    };

    Ok(CartShowTemplate { layout, cart })
}

/// Cart count badge (HTMX).
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: cart_service::cart_count(&session).await,
    }
}

/// Add item to cart.
///
/// Creates the cart on first use. HTMX requests get the refreshed badge;
/// plain form posts are redirected to the cart page.
#[instrument(skip(state, session, headers, form), fields(variant_id = %form.variant_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let htmx = is_htmx(&headers);
    let quantity = form.quantity.unwrap_or(1).max(1);
    let variant_id = VariantId::new(form.variant_id);

    let result = async {
        let cart = cart_service::get_or_create_cart(&state, &session).await?;
        Ok::<_, AppError>(
            state
                .store()
                .add_line_item(&cart.id, &variant_id, quantity)
                .await?,
        )
    }
    .await;

    match result {
        Ok(cart) => {
            remember_cart(&session, &cart).await?;
            tracing::info!(cart_id = %cart.id, count = cart.item_count(), "Added to cart");

            if htmx {
                Ok((
                    AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]),
                    CartCountTemplate {
                        count: cart.item_count(),
                    },
                )
                    .into_response())
            } else {
                push_toast(&session, Toast::success("Added to your cart.")).await;
                Ok(Redirect::to("/cart").into_response())
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to add item to cart");
            push_toast(&session, Toast::error(e.user_message())).await;
            let back = form
                .return_to
                .as_deref()
                .filter(|t| is_safe_redirect(t))
                .unwrap_or("/cart");
            Ok(failure_response(htmx, back))
        }
    }
}

/// Update cart item quantity. Quantity 0 removes the line.
#[instrument(skip(state, session, headers, form), fields(line_id = %form.line_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let htmx = is_htmx(&headers);
    let Some(cart_id) = cart_service::cart_id(&session).await else {
        return Ok(failure_response(htmx, "/cart"));
    };
    let line_id = LineItemId::new(form.line_id);

    let result = if form.quantity == 0 {
        state.store().delete_line_item(&cart_id, &line_id).await
    } else {
        state
            .store()
            .update_line_item(&cart_id, &line_id, form.quantity)
            .await
    };

    finish_mutation(&state, &session, htmx, result.map_err(AppError::from)).await
}

/// Remove item from cart.
#[instrument(skip(state, session, headers, form), fields(line_id = %form.line_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let htmx = is_htmx(&headers);
    let Some(cart_id) = cart_service::cart_id(&session).await else {
        return Ok(failure_response(htmx, "/cart"));
    };

    let result = state
        .store()
        .delete_line_item(&cart_id, &LineItemId::new(form.line_id))
        .await;

    finish_mutation(&state, &session, htmx, result.map_err(AppError::from)).await
}

/// Whether the backend accepted `code` (codes compare case-insensitively).
fn has_code(cart: &Cart, code: &str) -> bool {
    cart.promo_codes()
        .iter()
        .any(|applied| applied.eq_ignore_ascii_case(code))
}

/// Apply a promotion code.
///
/// The backend can answer with an unchanged cart for codes it does not
/// recognise, so the returned cart is checked for the code.
#[instrument(skip(state, session, form))]
pub async fn apply_promotion(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PromotionForm>,
) -> Result<Redirect> {
    let code = form.code.trim().to_string();
    if code.is_empty() {
        push_toast(&session, Toast::error("Please enter a promotion code.")).await;
        return Ok(Redirect::to("/cart"));
    }
    let Some(cart_id) = cart_service::cart_id(&session).await else {
        return Ok(Redirect::to("/cart"));
    };

    match state
        .store()
        .apply_promotions(&cart_id, std::slice::from_ref(&code))
        .await
    {
        Ok(cart) => {
            remember_cart(&session, &cart).await?;
            if has_code(&cart, &code) {
                push_toast(&session, Toast::success(format!("Code {code} applied."))).await;
            } else {
                push_toast(
                    &session,
                    Toast::error(format!("Code {code} is not valid for this cart.")),
                )
                .await;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to apply promotion");
            let e = AppError::from(e);
            let message = match cart_service::drop_if_stale(&state, &session, &e).await {
                Ok(true) => CART_EXPIRED.to_string(),
                _ => format!("Code {code} could not be applied."),
            };
            push_toast(&session, Toast::error(message)).await;
        }
    }

    Ok(Redirect::to("/cart"))
}

/// Remove a promotion code.
#[instrument(skip(state, session, form))]
pub async fn remove_promotion(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PromotionForm>,
) -> Result<Response> {
    let Some(cart_id) = cart_service::cart_id(&session).await else {
        return Ok(Redirect::to("/cart").into_response());
    };

    let result = state
        .store()
        .remove_promotions(&cart_id, &[form.code.trim().to_string()])
        .await;

    finish_mutation(&state, &session, false, result.map_err(AppError::from)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;

    fn cart() -> Cart {
        serde_json::from_value(json!({
            "id": "cart_1",
            "currency_code": "usd",
            "items": [
                {
                    "id": "li_1",
                    "title": "Medium",
                    "product_title": "Linen Shirt",
                    "product_handle": "linen-shirt",
                    "variant_title": "Medium",
                    "quantity": 2,
                    "unit_price": 25
                },
                {
                    "id": "li_2",
                    "title": "Default",
                    "variant_title": "Default",
                    "quantity": 1,
                    "unit_price": 10,
                    "total": 8
                }
            ],
            "promotions": [
                {"id": "promo_1", "code": "SUMMER10", "is_automatic": false},
                {"id": "promo_2", "code": "AUTO", "is_automatic": true}
            ],
            "item_subtotal": 60,
            "discount_total": 2,
            "total": 58
        }))
        .unwrap()
    }

    #[test]
    fn test_cart_view_uses_backend_totals() {
        let view = CartView::from(&cart());

        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "$60.00");
        assert_eq!(view.discount.as_deref(), Some("$2.00"));
        assert_eq!(view.tax, None);
        assert_eq!(view.shipping, None);
        assert_eq!(view.total, "$58.00");
        assert_eq!(view.promo_codes, vec!["SUMMER10".to_string()]);
    }

    #[test]
    fn test_cart_item_view_line_totals() {
        let view = CartView::from(&cart());

        assert_eq!(view.items[0].title, "Linen Shirt");
        assert_eq!(view.items[0].variant_title.as_deref(), Some("Medium"));
        assert_eq!(view.items[0].line_total, "$50.00");
        assert_eq!(view.items[1].variant_title, None);
        assert_eq!(view.items[1].line_total, "$8.00");
    }

    #[test]
    fn test_has_code_ignores_case() {
        let cart = cart();
        assert!(has_code(&cart, "summer10"));
        assert!(!has_code(&cart, "AUTO"));
        assert!(!has_code(&cart, "WINTER"));
    }

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }
}
