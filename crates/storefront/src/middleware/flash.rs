//! Toast notifications carried in the session across a redirect.

use tower_sessions::Session;

use crate::models::{Toast, session_keys};

/// Queue a toast for the next rendered page.
///
/// Session write failures are logged, not returned.
pub async fn push_toast(session: &Session, toast: Toast) {
    let mut toasts = session
        .get::<Vec<Toast>>(session_keys::TOASTS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    toasts.push(toast);

    if let Err(e) = session.insert(session_keys::TOASTS, toasts).await {
        tracing::warn!(error = %e, "Failed to store toast in session");
    }
}

/// Remove and return all pending toasts.
pub async fn take_toasts(session: &Session) -> Vec<Toast> {
    session
        .remove::<Vec<Toast>>(session_keys::TOASTS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
