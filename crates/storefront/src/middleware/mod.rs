//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID
//! 4. Security headers (reads the nonce from the response)
//! 5. CSP nonce
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//! 7. Rate limiting on `/auth` (governor)

pub mod auth;
pub mod csp;
pub mod flash;
pub mod layout;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{GuestOnly, OptionalAuth, RequireAuth, clear_current_customer, set_current_customer};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use flash::{push_toast, take_toasts};
pub use layout::{CountryOption, Layout};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::session_layer;
