//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Starts locked down. Product images are served by the commerce backend or
//! its CDN, so `img-src` allows any HTTPS origin and COEP is `credentialless`.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::middleware::CspNonce;

/// Origin serving the HTMX script.
const HTMX_ORIGIN: &str = "https://unpkg.com";

/// Content Security Policy with an optional script nonce.
///
/// ```text
/// default-src 'none';
/// script-src 'self' https://unpkg.com 'nonce-…';
/// style-src 'self';
/// img-src 'self' https: data:;
/// connect-src 'self';
/// form-action 'self';
/// frame-ancestors 'none';
/// ```
#[must_use]
pub fn content_security_policy(nonce: Option<&str>) -> String {
    let script_src = match nonce {
        Some(nonce) if !nonce.is_empty() => {
            format!("script-src 'self' {HTMX_ORIGIN} 'nonce-{nonce}'")
        }
        _ => format!("script-src 'self' {HTMX_ORIGIN}"),
    };

    [
        "default-src 'none'",
        &script_src,
        "style-src 'self'",
        "font-src 'self'",
        "img-src 'self' https: data:",
        "connect-src 'self'",
        "frame-src 'none'",
        "object-src 'none'",
        "base-uri 'self'",
        "form-action 'self'",
        "frame-ancestors 'none'",
    ]
    .join("; ")
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Content-Security-Policy` (see [`content_security_policy`])
/// - `Permissions-Policy` denying sensitive features
/// - `Cache-Control: no-store` on pages (carts and accounts are per-visitor)
/// - `Cross-Origin-Opener-Policy: same-origin`
/// - `Cross-Origin-Embedder-Policy: credentialless`
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_static = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;

    let csp = content_security_policy(
        response
            .extensions()
            .get::<CspNonce>()
            .map(CspNonce::value),
    );

    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             microphone=(), \
             payment=(), \
             usb=(), \
             xr-spatial-tracking=()",
        ),
    );

    if !is_static && !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("credentialless"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_includes_nonce() {
        let csp = content_security_policy(Some("abc123=="));
        assert!(csp.contains("script-src 'self' https://unpkg.com 'nonce-abc123=='"));
        assert!(csp.contains("img-src 'self' https: data:"));
    }

    #[test]
    fn test_policy_without_nonce() {
        let csp = content_security_policy(None);
        assert!(csp.contains("script-src 'self' https://unpkg.com;"));
        assert!(!csp.contains("nonce-"));
        assert_eq!(content_security_policy(Some("")), csp);
    }
}
