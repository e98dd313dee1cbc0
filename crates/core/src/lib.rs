//! Shopi Section Core - Shared types library.
//!
//! This crate provides common types used across all Shopi Section components:
//! - `app` - Embedded Shopify admin application (section installer, carousel editor)
//! - `cli` - Command-line tools for migrations and session management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated newtypes for shop domains, theme IDs, asset keys and
//!   section actions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
