//! Business logic services.
//!
//! # Services
//!
//! - `auth` - OAuth callback HMACs and App Bridge session tokens
//! - `carousel` - Carousel slide metafield
//! - `diagnostics` - Step-by-step theme access checks
//! - `installer` - Section activation and deactivation
//! - `metafields` - Installed-sections metafield with optimistic writes
//! - `theme_editor` - Home page template edits
//! - `themes` - Theme listing with installation status

pub mod auth;
pub mod carousel;
pub mod diagnostics;
pub mod installer;
pub mod metafields;
pub mod theme_editor;
pub mod themes;

pub use auth::{
    SessionClaims, SessionTokenError, generate_oauth_state, verify_callback_hmac,
    verify_session_token,
};
pub use installer::{Activation, Deactivation, SectionError, SectionInstaller, UploadMethod};
pub use metafields::{InstalledSections, MetafieldError, ShopLocks};
