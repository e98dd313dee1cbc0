//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::SessionStorage;
use crate::services::ShopLocks;
use crate::shopify::AdminClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration, the Shopify client and session storage.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    shopify: AdminClient,
    sessions: Arc<dyn SessionStorage>,
    locks: ShopLocks,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("shopify", &self.inner.shopify)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - App configuration
    /// * `sessions` - Offline session storage (Postgres in production)
    #[must_use]
    pub fn new(config: AppConfig, sessions: Arc<dyn SessionStorage>) -> Self {
        let shopify = AdminClient::new(&config.shopify);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                shopify,
                sessions,
                locks: ShopLocks::new(),
            }),
        }
    }

    /// Get a reference to the app configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &AdminClient {
        &self.inner.shopify
    }

    /// Get a reference to the offline session storage.
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStorage {
        self.inner.sessions.as_ref()
    }

    /// Get a reference to the per-shop metafield locks.
    #[must_use]
    pub fn locks(&self) -> &ShopLocks {
        &self.inner.locks
    }
}
