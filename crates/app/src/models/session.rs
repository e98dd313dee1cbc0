//! Shop session types.
//!
//! A shop session is the offline access token Shopify hands out at install
//! time. The cookie session only carries short-lived OAuth state.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use shopi_section_core::ShopDomain;

/// An installed shop and its offline access token.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    /// Session ID, always `offline_{shop}`.
    pub id: String,
    /// Shop the token belongs to.
    pub shop: ShopDomain,
    /// Offline Admin API access token.
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// When the shop first installed the app.
    pub created_at: DateTime<Utc>,
    /// When the token was last replaced.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("id", &self.id)
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl ShopSession {
    /// Build a fresh session for a shop.
    #[must_use]
    pub fn new(shop: ShopDomain, access_token: SecretString, scope: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Self::offline_id(&shop),
            shop,
            access_token,
            scopes: crate::config::parse_scopes(scope),
            created_at: now,
            updated_at: now,
        }
    }

    /// Session ID for a shop's offline token.
    #[must_use]
    pub fn offline_id(shop: &ShopDomain) -> String {
        format!("offline_{shop}")
    }

    /// Scopes joined the way Shopify reports them.
    #[must_use]
    pub fn scope(&self) -> String {
        self.scopes.join(",")
    }

    /// Whether the token was granted `scope`.
    ///
    /// `write_*` scopes imply the matching `read_*` scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|granted| {
            granted == scope
                || scope
                    .strip_prefix("read_")
                    .is_some_and(|rest| granted.strip_prefix("write_") == Some(rest))
        })
    }
}

/// Cookie session keys.
pub mod keys {
    /// OAuth `state` nonce issued by `/auth/login`.
    pub const OAUTH_STATE: &str = "shopify_oauth_state";

    /// Shop the OAuth flow was started for.
    pub const OAUTH_SHOP: &str = "shopify_oauth_shop";
}
