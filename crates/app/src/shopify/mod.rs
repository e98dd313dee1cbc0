//! Shopify Admin API client.
//!
//! # Security
//!
//! Every call runs with a shop's offline access token. Tokens live in the
//! session table and are handed to [`AdminClient::shop`] per request; the
//! client itself never caches them.
//!
//! # Architecture
//!
//! - REST for themes, theme assets and access scopes
//! - GraphQL (via the `graphql-client` query trait) for `themeFilesUpsert`
//!   and shop metafields
//! - OAuth helpers for the install flow
//!
//! # Example
//!
//! ```rust,ignore
//! use shopi_section_app::shopify::AdminClient;
//!
//! let client = AdminClient::new(&config.shopify);
//! let admin = client.shop(&shop, &access_token);
//!
//! let themes = admin.list_themes().await?;
//! admin.put_asset(themes[0].id, &key, "{% schema %}{}{% endschema %}").await?;
//! ```

mod admin;
pub mod types;

pub use admin::{AdminClient, OAuthToken, ShopAdmin, queries};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Access token missing, revoked or expired (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token lacks a required scope or the resource is protected (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success HTTP status.
    #[error("Shopify returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// A metafield write was rejected because its `compareDigest` is stale.
    #[error("Metafield {0} was modified concurrently")]
    StaleMetafield(String),

    /// OAuth code exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(String),
}

impl AdminShopifyError {
    /// Whether the shop must re-run OAuth (token rejected by Shopify).
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }

    /// Whether an asset upload may succeed through a different method.
    ///
    /// Shopify answers 404 for theme writes on some API versions and for
    /// protected themes, and occasionally 5xx while a theme is processing.
    #[must_use]
    pub const fn is_upload_fallback_candidate(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::UserError(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
