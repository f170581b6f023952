//! Authentication error types.

use thiserror::Error;

use crate::commerce::CommerceError;

/// Errors that can occur during sign-in and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] harbor_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No identity registered for the email.
    #[error("customer not found")]
    CustomerNotFound,

    /// Email already registered.
    #[error("customer already exists")]
    CustomerAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Any other Store API failure.
    #[error("backend error: {0}")]
    Backend(CommerceError),
}

impl AuthError {
    /// Classify a Store API failure from an auth call.
    #[must_use]
    pub fn from_commerce(err: CommerceError) -> Self {
        match &err {
            CommerceError::NotFound(_) => Self::CustomerNotFound,
            // Registration conflicts can arrive as 401 with this message
            CommerceError::Api { message, .. }
                if message.to_ascii_lowercase().contains("already exists") =>
            {
                Self::CustomerAlreadyExists
            }
            CommerceError::Api { status: 401, .. } => Self::InvalidCredentials,
            CommerceError::Api { status: 409, .. } => Self::CustomerAlreadyExists,
            _ => Self::Backend(err),
        }
    }

    /// Message shown to the visitor in a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::CustomerNotFound => "No account found for that email".to_string(),
            Self::CustomerAlreadyExists => "An account with this email already exists".to_string(),
            Self::WeakPassword(message) => message.clone(),
            Self::Backend(_) => "Something went wrong, please try again.".to_string(),
        }
    }
}

impl From<CommerceError> for AuthError {
    fn from(err: CommerceError) -> Self {
        Self::from_commerce(err)
    }
}
