//! Customer authentication extractors and session helpers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session_keys};

/// Extractor that requires a signed-in customer.
///
/// Visitors without a customer in the session are redirected to the login
/// page, which sends them back here afterwards.
///
/// # Example
///
/// ```rust,ignore
/// async fn account(RequireAuth(customer): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", customer.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Rejection for [`RequireAuth`].
pub enum AuthRejection {
    /// Redirect to the login page, remembering where the visitor was going.
    RedirectToLogin(String),
    /// No session layer installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&login_url(&next)).into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        let customer: CurrentCustomer = session
            .get(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                // Nested routers see a stripped URI; return to the full path
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map_or_else(|| parts.uri.path(), |original| original.path());
                AuthRejection::RedirectToLogin(path.to_string())
            })?;

        Ok(Self(customer))
    }
}

/// Extractor that optionally gets the signed-in customer.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => current_customer(session).await,
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Extractor for pages only guests see (login, registration).
///
/// Signed-in customers are redirected to the page's `next` target, or
/// `/account`. Placed before [`Layout`](super::Layout) so the redirect leaves
/// pending toasts for the page it lands on.
pub struct GuestOnly;

impl<S> FromRequestParts<S> for GuestOnly
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self);
        };
        if current_customer(session).await.is_none() {
            return Ok(Self);
        }

        let next = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "next")
                .map(|(_, value)| value.into_owned())
        });
        let target = next
            .as_deref()
            .filter(|n| is_safe_redirect(n))
            .unwrap_or("/account");
        Err(Redirect::to(target))
    }
}

/// Read the signed-in customer from the session.
pub async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()
}

/// Store the signed-in customer in the session.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Remove the customer from the session (logout or rejected token).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}

/// Login URL that returns to `next` after signing in.
#[must_use]
pub fn login_url(next: &str) -> String {
    if is_safe_redirect(next) && next != "/" {
        let mut url = url::form_urlencoded::Serializer::new(String::new());
        url.append_pair("next", next);
        format!("/auth/login?{}", url.finish())
    } else {
        "/auth/login".to_string()
    }
}

/// Whether `target` is a local path (no scheme, no protocol-relative URL).
#[must_use]
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/account/orders"), "/auth/login?next=%2Faccount%2Forders");
        assert_eq!(login_url("/"), "/auth/login");
    }

    #[test]
    fn test_login_url_drops_external_targets() {
        assert_eq!(login_url("//evil.example"), "/auth/login");
        assert_eq!(login_url("https://evil.example"), "/auth/login");
    }

    #[test]
    fn test_is_safe_redirect() {
        assert!(is_safe_redirect("/checkout?step=address"));
        assert!(!is_safe_redirect("/\\evil.example"));
        assert!(!is_safe_redirect("account"));
    }
}
