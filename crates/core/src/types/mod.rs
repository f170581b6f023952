//! Core types for Harbor.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod country;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use country::{CountryCode, CountryCodeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, CurrencyCodeError, Price};
pub use status::*;
