//! Checkout wizard route handlers.
//!
//! Steps run in a fixed order: address, delivery, payment, review. The step a
//! visitor may see is derived from the cart itself, so a step only becomes
//! reachable once the backend accepted the previous one. Every failed call
//! leaves the visitor on the same step with an error toast.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{PaymentProviderId, ShippingOptionId};

use crate::commerce::{
    Cart, CartCompletion, ShippingOption, ShippingPriceType, UpdateCartInput,
};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Layout, auth::current_customer, flash::push_toast};
use crate::models::{AddressForm, Toast};
use crate::routes::cart::CartView;
use crate::services::cart::{forget_cart, load_cart, remember_cart};
use crate::state::AppState;

// =============================================================================
// Steps
// =============================================================================

/// A checkout step, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStep {
    Address,
    Delivery,
    Payment,
    Review,
}

impl CheckoutStep {
    /// All steps, in order.
    pub const ALL: [Self; 4] = [Self::Address, Self::Delivery, Self::Payment, Self::Review];

    /// Parse the `step` query value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "address" => Some(Self::Address),
            "delivery" => Some(Self::Delivery),
            "payment" => Some(Self::Payment),
            "review" => Some(Self::Review),
            _ => None,
        }
    }

    /// `step` query value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Delivery => "delivery",
            Self::Payment => "payment",
            Self::Review => "review",
        }
    }

    /// Heading shown in the step indicator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Address => "Address",
            Self::Delivery => "Delivery",
            Self::Payment => "Payment",
            Self::Review => "Review",
        }
    }

    /// Checkout URL for this step.
    #[must_use]
    pub fn href(self) -> String {
        format!("/checkout?step={}", self.as_str())
    }
}

/// Latest step the cart has unlocked.
#[must_use]
pub fn furthest_step(cart: &Cart) -> CheckoutStep {
    let has_email = cart.email.as_deref().is_some_and(|e| !e.trim().is_empty());
    let has_address = cart
        .shipping_address
        .as_ref()
        .and_then(|a| a.address_1.as_deref())
        .is_some_and(|a| !a.trim().is_empty());

    if !has_email || !has_address {
        CheckoutStep::Address
    } else if cart.shipping_methods.is_empty() {
        CheckoutStep::Delivery
    } else if cart.active_payment_session().is_none() {
        CheckoutStep::Payment
    } else {
        CheckoutStep::Review
    }
}

/// Step to show for a request: the requested step, clamped to what the cart
/// has unlocked. No (or an unknown) request means the furthest step.
#[must_use]
pub fn resolve_step(requested: Option<&str>, cart: &Cart) -> CheckoutStep {
    let furthest = furthest_step(cart);
    requested
        .and_then(CheckoutStep::parse)
        .map_or(furthest, |step| step.min(furthest))
}

// =============================================================================
// View Types
// =============================================================================

/// Entry in the step indicator.
#[derive(Clone)]
pub struct StepLink {
    pub label: &'static str,
    pub href: String,
    pub current: bool,
    /// Reachable (at or before the furthest unlocked step).
    pub unlocked: bool,
}

/// Shipping option display data.
#[derive(Clone)]
pub struct ShippingOptionView {
    pub id: String,
    pub name: String,
    pub price: Option<String>,
    pub selected: bool,
    pub available: bool,
}

/// Payment provider display data.
#[derive(Clone)]
pub struct PaymentProviderView {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

/// Summary shown on the review step.
#[derive(Clone, Default)]
pub struct ReviewView {
    pub email: String,
    pub shipping_name: String,
    pub shipping_address: String,
    pub billing_address: String,
    pub shipping_method: String,
    pub payment: String,
}

impl ReviewView {
    fn new(cart: &Cart) -> Self {
        let shipping = cart.shipping_address.clone().unwrap_or_default();
        Self {
            email: cart.email.clone().unwrap_or_default(),
            shipping_name: shipping.full_name(),
            shipping_address: shipping.summary(),
            billing_address: cart
                .billing_address
                .as_ref()
                .map_or_else(|| shipping.summary(), crate::commerce::Address::summary),
            shipping_method: cart
                .shipping_methods
                .iter()
                .map(|m| m.name.clone())
                .collect::<Vec<_>>()
                .join(", "),
            payment: cart
                .active_payment_session()
                .map(|s| provider_label(s.provider_id.as_str()))
                .unwrap_or_default(),
        }
    }
}

fn provider_label(id: &str) -> String {
    crate::commerce::PaymentProvider {
        id: PaymentProviderId::new(id),
        is_enabled: true,
    }
    .label()
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub step: &'static str,
    pub steps: Vec<StepLink>,
    pub cart: CartView,
    pub email: String,
    pub shipping: AddressForm,
    pub billing: AddressForm,
    pub billing_same: bool,
    pub shipping_options: Vec<ShippingOptionView>,
    pub payment_providers: Vec<PaymentProviderView>,
    /// The step's choices could not be loaded.
    pub choices_unavailable: bool,
    pub review: ReviewView,
}

// =============================================================================
// Forms
// =============================================================================

/// Query parameters for the checkout page.
#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub step: Option<String>,
}

/// Address step form. Shipping and billing fields are prefixed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutAddressForm {
    pub email: String,
    pub shipping_first_name: String,
    pub shipping_last_name: String,
    pub shipping_company: String,
    pub shipping_address_1: String,
    pub shipping_address_2: String,
    pub shipping_city: String,
    pub shipping_province: String,
    pub shipping_postal_code: String,
    pub shipping_country_code: String,
    pub shipping_phone: String,
    /// Checkbox: present when billing matches shipping.
    pub billing_same: Option<String>,
    pub billing_first_name: String,
    pub billing_last_name: String,
    pub billing_company: String,
    pub billing_address_1: String,
    pub billing_address_2: String,
    pub billing_city: String,
    pub billing_province: String,
    pub billing_postal_code: String,
    pub billing_country_code: String,
    pub billing_phone: String,
}

impl CheckoutAddressForm {
    /// Shipping address fields.
    #[must_use]
    pub fn shipping(&self) -> AddressForm {
        AddressForm {
            first_name: self.shipping_first_name.clone(),
            last_name: self.shipping_last_name.clone(),
            company: self.shipping_company.clone(),
            address_1: self.shipping_address_1.clone(),
            address_2: self.shipping_address_2.clone(),
            city: self.shipping_city.clone(),
            province: self.shipping_province.clone(),
            postal_code: self.shipping_postal_code.clone(),
            country_code: self.shipping_country_code.clone(),
            phone: self.shipping_phone.clone(),
        }
    }

    /// Billing address fields (the shipping address when marked the same).
    #[must_use]
    pub fn billing(&self) -> AddressForm {
        if self.billing_same.is_some() {
            return self.shipping();
        }
        AddressForm {
            first_name: self.billing_first_name.clone(),
            last_name: self.billing_last_name.clone(),
            company: self.billing_company.clone(),
            address_1: self.billing_address_1.clone(),
            address_2: self.billing_address_2.clone(),
            city: self.billing_city.clone(),
            province: self.billing_province.clone(),
            postal_code: self.billing_postal_code.clone(),
            country_code: self.billing_country_code.clone(),
            phone: self.billing_phone.clone(),
        }
    }

    /// Validate and build the cart update.
    ///
    /// # Errors
    ///
    /// Returns a message for the visitor when a field is missing or invalid.
    pub fn to_update(&self) -> std::result::Result<UpdateCartInput, String> {
        let email = harbor_core::Email::parse(&self.email)
            .map_err(|_| "Please enter a valid email address.".to_string())?;
        let shipping = self.shipping().to_input()?;
        let billing = self
            .billing()
            .to_input()
            .map_err(|e| format!("Billing address: {e}"))?;

        Ok(UpdateCartInput {
            region_id: None,
            email: Some(email.into_inner()),
            shipping_address: Some(shipping),
            billing_address: Some(billing),
        })
    }
}

/// Delivery step form.
#[derive(Debug, Deserialize)]
pub struct DeliveryForm {
    pub option_id: String,
}

/// Payment step form.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub provider_id: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// The session's cart when it has items, or a redirect to the cart page.
async fn checkout_cart(
    state: &AppState,
    session: &Session,
) -> Result<std::result::Result<Cart, Redirect>> {
    match load_cart(state, session).await? {
        Some(cart) if !cart.is_empty() => Ok(Ok(cart)),
        _ => {
            push_toast(session, Toast::info("Your cart is empty.")).await;
            Ok(Err(Redirect::to("/cart")))
        }
    }
}

/// The cart, provided `step` is unlocked; otherwise a redirect to the
/// furthest step it has reached.
async fn cart_at_step(
    state: &AppState,
    session: &Session,
    step: CheckoutStep,
) -> Result<std::result::Result<Cart, Redirect>> {
    let cart = match checkout_cart(state, session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(Err(redirect)),
    };
    let furthest = furthest_step(&cart);
    if step > furthest {
        tracing::debug!(step = step.as_str(), furthest = furthest.as_str(), "Step not yet unlocked");
        return Ok(Err(Redirect::to(&furthest.href())));
    }
    Ok(Ok(cart))
}

/// Log a failed step, toast it and send the visitor back to it.
async fn step_failed(session: &Session, step: CheckoutStep, error: &AppError) -> Redirect {
    tracing::warn!(step = step.as_str(), error = %error, "Checkout step failed");
    push_toast(session, Toast::error(error.user_message())).await;
    Redirect::to(&step.href())
}

/// Log a step whose choices could not be loaded and toast it on this render.
///
/// The step still renders, with nothing to choose from.
fn step_unavailable<T>(layout: &mut Layout, step: CheckoutStep, error: &AppError) -> Vec<T> {
    tracing::warn!(step = step.as_str(), error = %error, "Checkout step choices unavailable");
    layout.toasts.push(Toast::error(error.user_message()));
    Vec::new()
}

/// Shipping options for the cart, pricing calculated options on the way.
async fn shipping_options(state: &AppState, cart: &Cart) -> Result<Vec<ShippingOptionView>> {
    let options = state.store().list_shipping_options(&cart.id).await?;
    let mut views = Vec::with_capacity(options.len());

    for option in options {
        let priced: Option<ShippingOption> = match option.price_type {
            ShippingPriceType::Calculated => {
                match state
                    .store()
                    .calculate_shipping_option(&option.id, &cart.id)
                    .await
                {
                    Ok(calculated) => Some(calculated),
                    Err(e) => {
                        tracing::warn!(option_id = %option.id, error = %e, "Shipping price calculation failed");
                        None
                    }
                }
            }
            _ => Some(option.clone()),
        };

        let selected = cart
            .shipping_methods
            .iter()
            .any(|m| m.shipping_option_id.as_ref() == Some(&option.id));
        let amount = priced.as_ref().and_then(|p| p.amount);

        views.push(ShippingOptionView {
            id: option.id.to_string(),
            name: option.name.clone(),
            price: amount.map(|a| cart.money(a).display()),
            selected,
            available: amount.is_some() && !option.insufficient_inventory,
        });
    }

    Ok(views)
}

/// Payment providers enabled for the cart's region.
async fn payment_providers(state: &AppState, cart: &Cart) -> Result<Vec<PaymentProviderView>> {
    let Some(region_id) = &cart.region_id else {
        return Err(AppError::Internal(format!("cart {} has no region", cart.id)));
    };
    let active = cart.active_payment_session().map(|s| s.provider_id.clone());

    Ok(state
        .store()
        .list_payment_providers(region_id)
        .await?
        .into_iter()
        .map(|p| PaymentProviderView {
            selected: active.as_ref() == Some(&p.id),
            label: p.label(),
            id: p.id.to_string(),
        })
        .collect())
}

/// Address step prefill: the cart's values, else the signed-in customer's.
async fn address_prefill(
    state: &AppState,
    session: &Session,
    cart: &Cart,
) -> (String, AddressForm, AddressForm) {
    let customer = current_customer(session).await;
    let email = cart
        .email
        .clone()
        .or_else(|| customer.as_ref().map(|c| c.email.clone()))
        .unwrap_or_default();

    let shipping = match (&cart.shipping_address, &customer) {
        (Some(address), _) => AddressForm::from(address),
        (None, Some(customer)) => match state.store().retrieve_customer(&customer.token).await {
            Ok(profile) => profile
                .default_address()
                .map(AddressForm::from)
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, "No saved address to prefill");
                AddressForm::default()
            }
        },
        (None, None) => AddressForm::default(),
    };
    let billing = cart
        .billing_address
        .as_ref()
        .map(AddressForm::from)
        .unwrap_or_default();

    (email, shipping, billing)
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout wizard at the requested (or furthest) step.
#[instrument(skip(state, session, layout, query))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    Query(query): Query<CheckoutQuery>,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let furthest = furthest_step(&cart);
    let step = resolve_step(query.step.as_deref(), &cart);

    let steps = CheckoutStep::ALL
        .iter()
        .map(|&s| StepLink {
            label: s.label(),
            href: s.href(),
            current: s == step,
            unlocked: s <= furthest,
        })
        .collect();

    let (email, shipping, billing) = if step == CheckoutStep::Address {
        address_prefill(&state, &session, &cart).await
    } else {
        Default::default()
    };
    let billing_same = billing == AddressForm::default() || billing == shipping;

    let mut choices_unavailable = false;
    let shipping_options = if step == CheckoutStep::Delivery {
        shipping_options(&state, &cart).await.unwrap_or_else(|e| {
            choices_unavailable = true;
            step_unavailable(&mut layout, step, &e)
        })
    } else {
        Vec::new()
    };
    let payment_providers = if step == CheckoutStep::Payment {
        payment_providers(&state, &cart).await.unwrap_or_else(|e| {
            choices_unavailable = true;
            step_unavailable(&mut layout, step, &e)
        })
    } else {
        Vec::new()
    };

    Ok(CheckoutTemplate {
        layout,
        step: step.as_str(),
        steps,
        cart: CartView::from(&cart),
        email,
        shipping,
        billing,
        billing_same,
        shipping_options,
        payment_providers,
        choices_unavailable,
        review: ReviewView::new(&cart),
    }
    .into_response())
}

/// Save email and addresses.
#[instrument(skip(state, session, form))]
pub async fn submit_address(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CheckoutAddressForm>,
) -> Result<Redirect> {
    let cart = match cart_at_step(&state, &session, CheckoutStep::Address).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };

    let input = match form.to_update() {
        Ok(input) => input,
        Err(message) => {
            push_toast(&session, Toast::error(message)).await;
            return Ok(Redirect::to(&CheckoutStep::Address.href()));
        }
    };

    match state.store().update_cart(&cart.id, &input).await {
        Ok(updated) => {
            remember_cart(&session, &updated).await?;
            Ok(Redirect::to(&CheckoutStep::Delivery.href()))
        }
        Err(e) => Ok(step_failed(&session, CheckoutStep::Address, &e.into()).await),
    }
}

/// Choose a shipping option.
#[instrument(skip(state, session, form), fields(option_id = %form.option_id))]
pub async fn submit_delivery(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<DeliveryForm>,
) -> Result<Redirect> {
    let cart = match cart_at_step(&state, &session, CheckoutStep::Delivery).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };

    let option_id = ShippingOptionId::new(form.option_id);
    match state.store().add_shipping_method(&cart.id, &option_id).await {
        Ok(updated) => {
            remember_cart(&session, &updated).await?;
            Ok(Redirect::to(&CheckoutStep::Payment.href()))
        }
        Err(e) => Ok(step_failed(&session, CheckoutStep::Delivery, &e.into()).await),
    }
}

/// Choose a payment provider and open a payment session.
#[instrument(skip(state, session, form), fields(provider_id = %form.provider_id))]
pub async fn submit_payment(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PaymentForm>,
) -> Result<Redirect> {
    let cart = match cart_at_step(&state, &session, CheckoutStep::Payment).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };

    let provider_id = PaymentProviderId::new(form.provider_id);
    match state
        .store()
        .initiate_payment_session(&cart, &provider_id)
        .await
    {
        Ok(updated) => {
            remember_cart(&session, &updated).await?;
            Ok(Redirect::to(&CheckoutStep::Review.href()))
        }
        Err(e) => Ok(step_failed(&session, CheckoutStep::Payment, &e.into()).await),
    }
}

/// Place the order.
#[instrument(skip(state, session))]
pub async fn complete(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let cart = match cart_at_step(&state, &session, CheckoutStep::Review).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };

    match state.store().complete_cart(&cart.id).await {
        Ok(CartCompletion::Order(order)) => {
            forget_cart(&session).await?;
            tracing::info!(order_id = %order.id, cart_id = %cart.id, "Order placed");
            push_toast(&session, Toast::success("Thank you! Your order has been placed.")).await;
            Ok(Redirect::to(&format!("/order/{}/confirmed", order.id)))
        }
        Ok(CartCompletion::Cart { cart, error }) => {
            tracing::warn!(cart_id = %cart.id, error = %error, "Cart could not be completed");
            remember_cart(&session, &cart).await?;
            let message = if error.trim().is_empty() {
                "We couldn't place your order. Please check your details and try again."
                    .to_string()
            } else {
                error
            };
            push_toast(&session, Toast::error(message)).await;
            Ok(Redirect::to(&CheckoutStep::Review.href()))
        }
        Err(e) => Ok(step_failed(&session, CheckoutStep::Review, &e.into()).await),
    }
}
