//! Core types for Shopi Section.
//!
//! This module provides type-safe wrappers for the Shopify concepts the app
//! passes around: shops, themes, theme assets and section actions.

pub mod section;
pub mod shop;
pub mod theme;

pub use section::{SectionAction, SectionActionError};
pub use shop::{ShopDomain, ShopDomainError};
pub use theme::{AssetKey, AssetKeyError, ThemeId, ThemeIdError};
