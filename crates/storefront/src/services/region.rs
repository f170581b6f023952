//! Region context.
//!
//! The visitor picks a country; the backend region serving that country
//! decides currency, prices, shipping options and payment providers.

use tower_sessions::Session;
use tracing::instrument;

use harbor_core::CountryCode;

use crate::commerce::{Region, UpdateCartInput};
use crate::error::AppError;
use crate::middleware::flash::push_toast;
use crate::models::{Toast, session_keys};
use crate::services::cart;
use crate::state::AppState;

/// The selected country, or `default` when none was chosen.
pub async fn current_country(session: &Session, default: &CountryCode) -> CountryCode {
    session
        .get::<CountryCode>(session_keys::COUNTRY_CODE)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| default.clone())
}

/// The region serving `country`, falling back to the first region.
#[must_use]
pub fn resolve_region<'a>(regions: &'a [Region], country: &CountryCode) -> Option<&'a Region> {
    regions
        .iter()
        .find(|r| r.has_country(country))
        .or_else(|| regions.first())
}

/// The region for the visitor's selected country.
///
/// # Errors
///
/// Returns an error if regions cannot be listed or the backend has none.
pub async fn current_region(state: &AppState, session: &Session) -> Result<Region, AppError> {
    let country = current_country(session, &state.config().default_country).await;
    let regions = state.store().list_regions().await?;
    resolve_region(&regions, &country)
        .cloned()
        .ok_or_else(|| AppError::Internal("commerce backend has no regions".to_string()))
}

async fn cart_not_moved(session: &Session, reason: &str) {
    push_toast(
        session,
        Toast::error(format!("Your cart stays priced in its previous region: {reason}")),
    )
    .await;
}

/// Switch the visitor's country.
///
/// When the session cart is priced in another region it is moved to the new
/// one so prices follow the selection.
///
/// # Errors
///
/// Returns an error if the session cannot be written or regions cannot be
/// listed. A failed cart move is reported as a toast.
#[instrument(skip(state, session), fields(country = %country))]
pub async fn set_country(
    state: &AppState,
    session: &Session,
    country: &CountryCode,
) -> Result<Region, AppError> {
    session.insert(session_keys::COUNTRY_CODE, country).await?;
    let region = current_region(state, session).await?;

    let existing = match cart::load_cart(state, session).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load cart for region move");
            cart_not_moved(session, &e.user_message()).await;
            None
        }
    };

    if let Some(existing) = existing
        && existing.region_id.as_ref() != Some(&region.id)
    {
        let input = UpdateCartInput {
            region_id: Some(region.id.clone()),
            ..UpdateCartInput::default()
        };
        match state.store().update_cart(&existing.id, &input).await {
            Ok(updated) => {
                cart::remember_cart(session, &updated).await?;
                tracing::info!(cart_id = %updated.id, region_id = %region.id, "Cart moved to region");
            }
            Err(e) => {
                tracing::warn!(cart_id = %existing.id, error = %e, "Failed to move cart to region");
                cart_not_moved(session, &e.user_message()).await;
            }
        }
    }

    Ok(region)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn regions() -> Vec<Region> {
        serde_json::from_value(json!([
            {"id": "reg_na", "name": "North America", "currency_code": "usd",
             "countries": [{"iso_2": "us"}, {"iso_2": "ca"}]},
            {"id": "reg_eu", "name": "Europe", "currency_code": "eur",
             "countries": [{"iso_2": "de"}, {"iso_2": "dk"}]}
        ]))
        .unwrap()
    }

    #[test]
    fn test_resolve_region_by_country() {
        let regions = regions();
        let dk = CountryCode::parse("dk").unwrap();
        assert_eq!(resolve_region(&regions, &dk).unwrap().id.as_str(), "reg_eu");
    }

    #[test]
    fn test_resolve_region_falls_back_to_first() {
        let regions = regions();
        let jp = CountryCode::parse("jp").unwrap();
        assert_eq!(resolve_region(&regions, &jp).unwrap().id.as_str(), "reg_na");
    }

    #[test]
    fn test_resolve_region_empty() {
        let us = CountryCode::parse("us").unwrap();
        assert!(resolve_region(&[], &us).is_none());
    }
}
