//! Page chrome shared by every full-page template.
//!
//! The [`Layout`] extractor gathers what `base.html` needs: CSP nonce, pending
//! toasts, cart badge count, signed-in customer and the country selector.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use tower_sessions::Session;

use crate::middleware::{CspNonce, auth::current_customer, flash::take_toasts};
use crate::models::Toast;
use crate::services::{cart, region};
use crate::state::AppState;

/// Country choice in the header selector.
#[derive(Debug, Clone)]
pub struct CountryOption {
    /// Lowercase ISO code.
    pub code: String,
    /// Display label.
    pub label: String,
}

/// Data rendered by the base layout.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// CSP nonce for inline scripts.
    pub nonce: String,
    /// Notifications to show once.
    pub toasts: Vec<Toast>,
    /// Items in the current cart.
    pub cart_count: u32,
    /// Greeting name of the signed-in customer.
    pub customer_name: Option<String>,
    /// Selected country code.
    pub country: String,
    /// Countries served by any region.
    pub countries: Vec<CountryOption>,
    /// Current path, used to return after switching country.
    pub path: String,
}

impl Layout {
    /// Whether a customer is signed in.
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.customer_name.is_some()
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_string())
            .unwrap_or_default();
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let path = uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), ToString::to_string);

        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            tracing::warn!("Session not found in request extensions - layer may be misconfigured");
            return Ok(Self {
                nonce,
                path,
                ..Self::default()
            });
        };

        let toasts = take_toasts(&session).await;
        let cart_count = cart::cart_count(&session).await;
        let customer_name =
            current_customer(&session).await.map(|c| c.display_name().to_string());
        let country = region::current_country(&session, &state.config().default_country).await;

        let countries = match state.store().list_regions().await {
            Ok(regions) => {
                let mut options: Vec<CountryOption> = regions
                    .iter()
                    .flat_map(|r| r.countries.iter())
                    .map(|c| CountryOption {
                        code: c.iso_2.to_ascii_lowercase(),
                        label: c.label(),
                    })
                    .collect();
                options.sort_by(|a, b| a.label.cmp(&b.label));
                options.dedup_by(|a, b| a.code == b.code);
                options
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load regions for country selector");
                Vec::new()
            }
        };

        Ok(Self {
            nonce,
            toasts,
            cart_count,
            customer_name,
            country: country.to_string(),
            countries,
            path,
        })
    }
}
