//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Customer login and registration against the Store API
//! - `cart` - Session cart lifecycle (load, create, remember, forget)
//! - `region` - Country selection and region resolution

pub mod auth;
pub mod cart;
pub mod region;
