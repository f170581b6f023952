//! Harbor Core - Shared types library.
//!
//! This crate provides common types used across all Harbor components:
//! - `storefront` - Public-facing e-commerce site
//! - `cli` - Command-line tools for migrations and backend checks
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. The commerce backend owns every durable entity; these
//! types describe the values the storefront passes around and displays.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, countries and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
