//! Country selector route handler.

use axum::{
    extract::{Form, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::CountryCode;

use crate::error::Result;
use crate::middleware::{auth::is_safe_redirect, flash::push_toast};
use crate::models::Toast;
use crate::services::region;
use crate::state::AppState;

/// Country selector form.
#[derive(Debug, Deserialize)]
pub struct RegionForm {
    pub country_code: String,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Where to go after switching country.
fn return_target(return_to: Option<&str>) -> &str {
    return_to.filter(|t| is_safe_redirect(t)).unwrap_or("/")
}

/// Switch the visitor's country (and with it, the pricing region).
#[instrument(skip(state, session, form), fields(country = %form.country_code))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegionForm>,
) -> Result<Redirect> {
    let target = return_target(form.return_to.as_deref()).to_string();

    match CountryCode::parse(&form.country_code) {
        Ok(country) => {
            let region = region::set_country(&state, &session, &country).await?;
            tracing::debug!(region_id = %region.id, "Country changed");
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected country code");
            push_toast(&session, Toast::error("Please choose a valid country.")).await;
        }
    }

    Ok(Redirect::to(&target))
}
