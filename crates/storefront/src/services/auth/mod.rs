//! Authentication service.
//!
//! Customer identities live in the commerce backend; this service validates
//! form input, drives the Store API auth flow and classifies its failures.

mod error;

pub use error::AuthError;

use harbor_core::Email;

use crate::commerce::{CustomerSession, RegisterCustomerInput, StoreClient};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form data.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a StoreClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a StoreClient) -> Self {
        Self { store }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for malformed emails, or the
    /// classified backend failure (invalid credentials, unknown account, ...).
    pub async fn login(&self, email: &str, password: &str) -> Result<CustomerSession, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.store.login(email.as_str(), password).await?;
        let customer = self.store.retrieve_customer(&token).await?;

        crate::error::set_sentry_user(&customer.id, Some(&customer.email));
        Ok(CustomerSession { token, customer })
    }

    /// Register a new customer and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` for bad
    /// input, `AuthError::CustomerAlreadyExists` if the email is taken, or the
    /// classified backend failure.
    pub async fn register(&self, registration: &Registration) -> Result<CustomerSession, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        let input = RegisterCustomerInput {
            email: email.as_str().to_string(),
            first_name: non_empty(&registration.first_name),
            last_name: non_empty(&registration.last_name),
            phone: registration.phone.as_deref().and_then(non_empty),
        };

        let session = self.store.register(&input, &registration.password).await?;
        crate::error::set_sentry_user(&session.customer.id, Some(&session.customer.email));
        Ok(session)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
