//! Session cart lifecycle.
//!
//! The session stores only the backend cart ID and the item count of the last
//! cart the backend returned. Every mutation replaces both with the returned
//! cart; totals are never computed here.

use tower_sessions::Session;
use tracing::instrument;

use harbor_core::CartId;

use crate::commerce::{Cart, CommerceError};
use crate::error::AppError;
use crate::middleware::auth::current_customer;
use crate::models::session_keys;
use crate::services::region;
use crate::state::AppState;

/// The session's cart ID, if any.
pub async fn cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<CartId>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
}

/// Item count of the last cart the backend returned.
pub async fn cart_count(session: &Session) -> u32 {
    session
        .get::<u32>(session_keys::CART_COUNT)
        .await
        .ok()
        .flatten()
        .unwrap_or(0)
}

/// Make `cart` the session's cart.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn remember_cart(
    session: &Session,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART_ID, &cart.id).await?;
    session
        .insert(session_keys::CART_COUNT, cart.item_count())
        .await
}

/// Drop the session's cart (completed or unknown to the backend).
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn forget_cart(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CartId>(session_keys::CART_ID).await?;
    session.remove::<u32>(session_keys::CART_COUNT).await?;
    Ok(())
}

/// Retrieve the session's cart.
///
/// A cart the backend no longer knows, or one that was already completed, is
/// dropped from the session and reported as `None`.
///
/// # Errors
///
/// Returns an error for backend failures other than not-found.
#[instrument(skip(state, session))]
pub async fn load_cart(state: &AppState, session: &Session) -> Result<Option<Cart>, AppError> {
    let Some(id) = cart_id(session).await else {
        return Ok(None);
    };

    match state.store().retrieve_cart(&id).await {
        Ok(cart) if cart.completed_at.is_some() => {
            tracing::info!(cart_id = %id, "Dropping completed cart from session");
            forget_cart(session).await?;
            Ok(None)
        }
        Ok(cart) => {
            remember_cart(session, &cart).await?;
            Ok(Some(cart))
        }
        Err(CommerceError::NotFound(_)) => {
            tracing::info!(cart_id = %id, "Dropping stale cart from session");
            forget_cart(session).await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Retrieve the session's cart or create one in the current region.
///
/// New carts belong to the signed-in customer, if any.
///
/// # Errors
///
/// Returns an error if the cart cannot be retrieved or created.
#[instrument(skip(state, session))]
pub async fn get_or_create_cart(state: &AppState, session: &Session) -> Result<Cart, AppError> {
    if let Some(cart) = load_cart(state, session).await? {
        return Ok(cart);
    }

    let region = region::current_region(state, session).await?;
    let customer = current_customer(session).await;
    let cart = state
        .store()
        .create_cart(&region.id, customer.as_ref().map(|c| c.token.as_str()))
        .await?;
    remember_cart(session, &cart).await?;
    Ok(cart)
}

/// After a cart mutation failed with not-found, check whether the cart
/// itself is gone (rather than the line or code it targeted).
///
/// Returns `true` when the cart was dropped from the session.
///
/// # Errors
///
/// Returns an error for backend failures other than not-found.
pub async fn drop_if_stale(
    state: &AppState,
    session: &Session,
    error: &AppError,
) -> Result<bool, AppError> {
    if !matches!(error, AppError::Commerce(CommerceError::NotFound(_))) {
        return Ok(false);
    }
    Ok(load_cart(state, session).await?.is_none())
}
