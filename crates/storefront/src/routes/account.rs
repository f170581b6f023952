//! Account route handlers.
//!
//! Every handler requires a signed-in customer. A token the backend rejects
//! signs the visitor out and sends them to the login page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{AddressId, OrderId};

use crate::commerce::{Address, CommerceError, Customer, UpdateCustomerInput};
use crate::error::Result;
use crate::filters;
use crate::middleware::{
    Layout, RequireAuth,
    auth::{clear_current_customer, login_url, set_current_customer},
    flash::push_toast,
};
use crate::models::{AddressForm, CurrentCustomer, Toast};
use crate::routes::order::{OrderSummaryView, OrderView};
use crate::state::AppState;

/// Orders shown on the overview.
const RECENT_ORDERS: u32 = 3;

/// Orders per page in the order history.
const ORDERS_PER_PAGE: u32 = 10;

// =============================================================================
// View Types
// =============================================================================

/// Profile display data.
#[derive(Clone)]
pub struct ProfileView {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl From<&Customer> for ProfileView {
    fn from(customer: &Customer) -> Self {
        Self {
            email: customer.email.clone(),
            first_name: customer.first_name.clone().unwrap_or_default(),
            last_name: customer.last_name.clone().unwrap_or_default(),
            phone: customer.phone.clone().unwrap_or_default(),
        }
    }
}

/// Saved address display data.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub phone: Option<String>,
}

impl AddressView {
    fn from_address(address: &Address) -> Option<Self> {
        Some(Self {
            id: address.id.as_ref()?.to_string(),
            name: address.full_name(),
            summary: address.summary(),
            phone: address.phone.clone().filter(|p| !p.is_empty()),
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub default_address: Option<String>,
    pub recent_orders: Vec<OrderSummaryView>,
}

/// Address book template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub layout: Layout,
    pub addresses: Vec<AddressView>,
    /// Address being edited; `None` when the form creates a new address.
    pub editing: Option<String>,
    pub form: AddressForm,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderSummaryView>,
    pub page: u32,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderDetailTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

// =============================================================================
// Forms
// =============================================================================

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

impl ProfileForm {
    fn to_input(&self) -> UpdateCustomerInput {
        let value = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        UpdateCustomerInput {
            first_name: value(&self.first_name),
            last_name: value(&self.last_name),
            phone: value(&self.phone),
        }
    }
}

/// Address book query parameters.
#[derive(Debug, Deserialize)]
pub struct AddressesQuery {
    pub edit: Option<String>,
}

/// Order history query parameters.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Sign out a customer whose token the backend rejected.
async fn expired(session: &Session, here: &str) -> Result<Response> {
    clear_current_customer(session).await?;
    push_toast(
        session,
        Toast::info("Your session has expired. Please sign in again."),
    )
    .await;
    Ok(Redirect::to(&login_url(here)).into_response())
}

/// Handle a failed mutation: expired tokens sign out, anything else is a
/// toast on the page the form came from.
async fn mutation_failed(session: &Session, back: &str, error: &CommerceError) -> Result<Response> {
    if error.is_unauthorized() {
        return expired(session, back).await;
    }
    tracing::warn!(error = %error, "Account update failed");
    push_toast(session, Toast::error(error.user_message())).await;
    Ok(Redirect::to(back).into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Account overview: profile, default address and recent orders.
#[instrument(skip(state, session, customer, layout))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    layout: Layout,
) -> Result<Response> {
    let store = state.store();
    let profile = match store.retrieve_customer(&customer.token).await {
        Ok(profile) => profile,
        Err(e) if e.is_unauthorized() => return expired(&session, "/account").await,
        Err(e) => return Err(e.into()),
    };
    let orders = match store.list_orders(&customer.token, RECENT_ORDERS, 0).await {
        Ok(page) => page.orders,
        Err(e) if e.is_unauthorized() => return expired(&session, "/account").await,
        Err(e) => return Err(e.into()),
    };

    Ok(AccountTemplate {
        layout,
        profile: ProfileView::from(&profile),
        default_address: profile.default_address().map(Address::summary),
        recent_orders: orders.iter().map(OrderSummaryView::from).collect(),
    }
    .into_response())
}

/// Update name and phone.
#[instrument(skip(state, session, customer, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    match state
        .store()
        .update_customer(&customer.token, &form.to_input())
        .await
    {
        Ok(updated) => {
            let refreshed = CurrentCustomer {
                first_name: updated.first_name,
                ..customer
            };
            set_current_customer(&session, &refreshed).await?;
            push_toast(&session, Toast::success("Profile updated.")).await;
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => mutation_failed(&session, "/account", &e).await,
    }
}

/// Address book, with the create (or edit) form.
#[instrument(skip(state, session, customer, layout, query))]
pub async fn addresses(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    layout: Layout,
    Query(query): Query<AddressesQuery>,
) -> Result<Response> {
    let profile = match state.store().retrieve_customer(&customer.token).await {
        Ok(profile) => profile,
        Err(e) if e.is_unauthorized() => return expired(&session, "/account/addresses").await,
        Err(e) => return Err(e.into()),
    };

    let editing = query.edit.as_deref().and_then(|id| {
        profile
            .addresses
            .iter()
            .find(|a| a.id.as_ref().is_some_and(|aid| aid.as_str() == id))
    });

    Ok(AddressesTemplate {
        layout,
        addresses: profile
            .addresses
            .iter()
            .filter_map(AddressView::from_address)
            .collect(),
        editing: editing.and_then(|a| a.id.as_ref()).map(ToString::to_string),
        form: editing.map(AddressForm::from).unwrap_or_default(),
    }
    .into_response())
}

/// Save a new address.
#[instrument(skip(state, session, customer, form))]
pub async fn create_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            push_toast(&session, Toast::error(message)).await;
            return Ok(Redirect::to("/account/addresses").into_response());
        }
    };

    match state.store().add_address(&customer.token, &input).await {
        Ok(_) => {
            push_toast(&session, Toast::success("Address saved.")).await;
            Ok(Redirect::to("/account/addresses").into_response())
        }
        Err(e) => mutation_failed(&session, "/account/addresses", &e).await,
    }
}

/// Replace a saved address.
#[instrument(skip(state, session, customer, form), fields(address_id = %id))]
pub async fn update_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let back = format!("/account/addresses?edit={id}");
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            push_toast(&session, Toast::error(message)).await;
            return Ok(Redirect::to(&back).into_response());
        }
    };

    match state
        .store()
        .update_address(&customer.token, &AddressId::new(id), &input)
        .await
    {
        Ok(_) => {
            push_toast(&session, Toast::success("Address updated.")).await;
            Ok(Redirect::to("/account/addresses").into_response())
        }
        Err(e) => mutation_failed(&session, &back, &e).await,
    }
}

/// Delete a saved address.
#[instrument(skip(state, session, customer), fields(address_id = %id))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    match state
        .store()
        .delete_address(&customer.token, &AddressId::new(id))
        .await
    {
        Ok(_) => {
            push_toast(&session, Toast::success("Address removed.")).await;
            Ok(Redirect::to("/account/addresses").into_response())
        }
        Err(e) => mutation_failed(&session, "/account/addresses", &e).await,
    }
}

/// Order history, newest first.
#[instrument(skip(state, session, customer, layout, query))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    layout: Layout,
    Query(query): Query<OrdersQuery>,
) -> Result<Response> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(ORDERS_PER_PAGE);

    let result = match state
        .store()
        .list_orders(&customer.token, ORDERS_PER_PAGE, offset)
        .await
    {
        Ok(result) => result,
        Err(e) if e.is_unauthorized() => return expired(&session, "/account/orders").await,
        Err(e) => return Err(e.into()),
    };

    let shown = u64::from(offset) + u64::try_from(result.orders.len()).unwrap_or(u64::MAX);
    Ok(OrdersTemplate {
        layout,
        orders: result.orders.iter().map(OrderSummaryView::from).collect(),
        page,
        prev_link: (page > 1).then(|| format!("/account/orders?page={}", page - 1)),
        next_link: (shown < result.count).then(|| format!("/account/orders?page={}", page + 1)),
    }
    .into_response())
}

/// A single order.
#[instrument(skip(state, session, customer, layout), fields(order_id = %id))]
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    layout: Layout,
    Path(id): Path<String>,
) -> Result<Response> {
    let here = format!("/account/orders/{id}");
    let order = match state
        .store()
        .retrieve_order(&OrderId::new(id), Some(&customer.token))
        .await
    {
        Ok(order) => order,
        Err(e) if e.is_unauthorized() => return expired(&session, &here).await,
        Err(e) => return Err(e.into()),
    };

    Ok(OrderDetailTemplate {
        layout,
        order: OrderView::from(&order),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_form_blank_fields_are_omitted() {
        let form = ProfileForm {
            first_name: " Ada ".to_string(),
            last_name: String::new(),
            phone: "  ".to_string(),
        };
        let input = form.to_input();
        assert_eq!(input.first_name.as_deref(), Some("Ada"));
        assert_eq!(input.last_name, None);
        assert_eq!(input.phone, None);
    }

    #[test]
    fn test_address_view_requires_id() {
        let mut address = Address {
            first_name: Some("Ada".to_string()),
            city: Some("London".to_string()),
            ..Address::default()
        };
        assert!(AddressView::from_address(&address).is_none());

        address.id = Some(AddressId::new("addr_1"));
        let view = AddressView::from_address(&address).unwrap();
        assert_eq!(view.id, "addr_1");
        assert_eq!(view.name, "Ada");
        assert_eq!(view.summary, "London");
    }
}
