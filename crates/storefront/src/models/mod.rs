//! Per-visitor state held in the session.
//!
//! The backend owns carts, customers and orders; the session only remembers
//! which ones belong to this visitor plus pending notifications.

pub mod address;
pub mod session;
pub mod toast;

pub use address::AddressForm;
pub use session::CurrentCustomer;
pub use session::keys as session_keys;
pub use toast::{Toast, ToastLevel};
