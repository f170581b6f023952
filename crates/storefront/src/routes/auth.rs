//! Authentication route handlers.
//!
//! Handles login, registration and logout against the commerce backend's
//! customer auth. Failures become error toasts on the form page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::commerce::{CommerceError, CustomerSession};
use crate::error::{Result, clear_sentry_user};
use crate::filters;
use crate::middleware::{
    Layout,
    auth::{GuestOnly, clear_current_customer, is_safe_redirect, set_current_customer},
    flash::push_toast,
};
use crate::models::{CurrentCustomer, Toast};
use crate::services::auth::{AuthService, Registration};
use crate::services::cart::{cart_id, forget_cart, remember_cart};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Query parameters carrying the post-login destination.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub next: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Local destination after signing in.
fn destination(next: Option<&str>) -> String {
    next.filter(|n| is_safe_redirect(n))
        .unwrap_or("/account")
        .to_string()
}

/// Form page URL that preserves `next`.
fn form_url(path: &str, next: Option<&str>) -> String {
    match next.filter(|n| is_safe_redirect(n)) {
        Some(next) => {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("next", next);
            format!("{path}?{}", query.finish())
        }
        None => path.to_string(),
    }
}

/// Store the customer in the session and hand them the visitor's cart.
async fn sign_in(state: &AppState, session: &Session, signed_in: CustomerSession) -> Result<()> {
    let token = signed_in.token.clone();
    let customer = CurrentCustomer::from(signed_in);
    set_current_customer(session, &customer).await?;
    tracing::info!(customer_id = %customer.id, "Customer signed in");

    if let Some(id) = cart_id(session).await {
        match state.store().transfer_cart(&id, &token).await {
            Ok(cart) => remember_cart(session, &cart).await?,
            Err(CommerceError::NotFound(_)) => forget_cart(session).await?,
            Err(e) => {
                tracing::warn!(cart_id = %id, error = %e, "Failed to transfer cart to customer");
            }
        }
    }

    push_toast(
        session,
        Toast::success(format!("Welcome, {}!", customer.display_name())),
    )
    .await;
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    _guest: GuestOnly,
    layout: Layout,
    Query(query): Query<NextQuery>,
) -> LoginTemplate {
    LoginTemplate {
        layout,
        next: query
            .next
            .filter(|n| is_safe_redirect(n))
            .unwrap_or_default(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let next = form.next.as_deref();

    match AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await
    {
        Ok(signed_in) => {
            sign_in(&state, &session, signed_in).await?;
            Ok(Redirect::to(&destination(next)))
        }
        Err(e) => {
            tracing::info!(error = %e, "Login failed");
            push_toast(&session, Toast::error(e.user_message())).await;
            Ok(Redirect::to(&form_url("/auth/login", next)))
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    _guest: GuestOnly,
    layout: Layout,
    Query(query): Query<NextQuery>,
) -> RegisterTemplate {
    RegisterTemplate {
        layout,
        next: query
            .next
            .filter(|n| is_safe_redirect(n))
            .unwrap_or_default(),
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    let next = form.next.as_deref();
    let back = form_url("/auth/register", next);

    if form.password != form.password_confirm {
        push_toast(&session, Toast::error("Passwords do not match.")).await;
        return Ok(Redirect::to(&back));
    }

    let registration = Registration {
        email: form.email.clone(),
        password: form.password.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        phone: form.phone.clone(),
    };

    match AuthService::new(state.store()).register(&registration).await {
        Ok(signed_in) => {
            sign_in(&state, &session, signed_in).await?;
            Ok(Redirect::to(&destination(next)))
        }
        Err(e) => {
            tracing::info!(error = %e, "Registration failed");
            push_toast(&session, Toast::error(e.user_message())).await;
            Ok(Redirect::to(&back))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// The cart belongs to the customer once they signed in, so it leaves with
/// them.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_customer(&session).await?;
    forget_cart(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    push_toast(&session, Toast::info("You have been signed out.")).await;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_defaults_to_account() {
        assert_eq!(destination(None), "/account");
        assert_eq!(destination(Some("/checkout")), "/checkout");
        assert_eq!(destination(Some("https://evil.example")), "/account");
    }

    #[test]
    fn test_form_url_keeps_next() {
        assert_eq!(
            form_url("/auth/login", Some("/checkout?step=address")),
            "/auth/login?next=%2Fcheckout%3Fstep%3Daddress"
        );
        assert_eq!(form_url("/auth/login", Some("//evil")), "/auth/login");
        assert_eq!(form_url("/auth/register", None), "/auth/register");
    }
}
