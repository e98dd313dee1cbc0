//! Installed-sections metafield store.
//!
//! `shopi_section.installed_sections` holds a JSON array of section ids. It is
//! updated read-modify-write, so concurrent updates are guarded twice:
//!
//! - a per-shop async lock serializes updates issued by this process, and
//! - every write carries the `compareDigest` of the value it was derived from,
//!   so a write racing another process fails with `STALE_OBJECT` and is
//!   retried from a fresh read.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use shopi_section_core::ShopDomain;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::shopify::{AdminShopifyError, MetafieldWrite, ShopAdmin, WriteCondition};

/// Metafield namespace owned by the app.
pub const NAMESPACE: &str = "shopi_section";

/// Key of the installed-sections list.
pub const INSTALLED_SECTIONS_KEY: &str = "installed_sections";

/// Key of the carousel slide data.
pub const CAROUSEL_DATA_KEY: &str = "carousel_data";

/// Attempts made before a contended update gives up.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Locks for shops with no update in this long are dropped.
const LOCK_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const MAX_TRACKED_SHOPS: u64 = 10_000;

/// Errors from metafield-backed stores.
#[derive(Debug, Error)]
pub enum MetafieldError {
    /// Shopify call failed.
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    /// Every attempt lost the compare-and-set race.
    #[error("metafield {key} kept changing; gave up after {attempts} attempts")]
    Conflict {
        /// Qualified metafield key.
        key: String,
        /// Attempts made.
        attempts: u32,
    },

    /// Value could not be serialized.
    #[error("failed to encode metafield value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl MetafieldError {
    /// Whether the shop must re-run OAuth.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::Shopify(e) if e.requires_reauth())
    }
}

/// Per-shop async locks, evicted when idle.
#[derive(Clone)]
pub struct ShopLocks {
    cache: Cache<String, Arc<Mutex<()>>>,
}

impl Default for ShopLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShopLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopLocks")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl ShopLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_TRACKED_SHOPS)
                .time_to_idle(LOCK_IDLE_TIMEOUT)
                .build(),
        }
    }

    /// The lock guarding a shop's metafield updates.
    pub async fn for_shop(&self, shop: &ShopDomain) -> Arc<Mutex<()>> {
        self.cache
            .get_with(shop.as_str().to_string(), async { Arc::new(Mutex::new(())) })
            .await
    }
}

/// Read-modify-write access to `shopi_section.installed_sections`.
pub struct InstalledSections<'a> {
    admin: &'a ShopAdmin,
    locks: &'a ShopLocks,
}

impl<'a> InstalledSections<'a> {
    /// Bind the store to a shop.
    #[must_use]
    pub const fn new(admin: &'a ShopAdmin, locks: &'a ShopLocks) -> Self {
        Self { admin, locks }
    }

    /// Installed section ids, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the metafield cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, MetafieldError> {
        let current = self
            .admin
            .shop_metafield(NAMESPACE, INSTALLED_SECTIONS_KEY)
            .await?;
        Ok(current
            .metafield
            .map(|m| decode_ids(&m.value))
            .unwrap_or_default())
    }

    /// Record a section. Returns `false` if it was already recorded.
    ///
    /// # Errors
    ///
    /// Returns `MetafieldError::Conflict` if concurrent writers kept winning.
    #[instrument(skip(self), fields(shop = %self.admin.shop_domain()))]
    pub async fn add(&self, id: &str) -> Result<bool, MetafieldError> {
        self.update(|ids| {
            if ids.iter().any(|existing| existing == id) {
                return false;
            }
            ids.push(id.to_string());
            true
        })
        .await
    }

    /// Forget a section. Returns `false` if it was not recorded.
    ///
    /// # Errors
    ///
    /// Returns `MetafieldError::Conflict` if concurrent writers kept winning.
    #[instrument(skip(self), fields(shop = %self.admin.shop_domain()))]
    pub async fn remove(&self, id: &str) -> Result<bool, MetafieldError> {
        self.update(|ids| {
            let before = ids.len();
            ids.retain(|existing| existing != id);
            ids.len() != before
        })
        .await
    }

    /// Apply `change` to the stored list. `change` returns whether it
    /// modified the list; unchanged lists are not written back.
    async fn update<F>(&self, change: F) -> Result<bool, MetafieldError>
    where
        F: Fn(&mut Vec<String>) -> bool + Send + Sync,
    {
        let lock = self.locks.for_shop(self.admin.shop_domain()).await;
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self
                .admin
                .shop_metafield(NAMESPACE, INSTALLED_SECTIONS_KEY)
                .await?;

            let mut ids = current
                .metafield
                .as_ref()
                .map(|m| decode_ids(&m.value))
                .unwrap_or_default();

            if !change(&mut ids) {
                return Ok(false);
            }

            let write = MetafieldWrite {
                owner_id: &current.shop_id,
                namespace: NAMESPACE,
                key: INSTALLED_SECTIONS_KEY,
                value: serde_json::to_string(&ids)?,
                condition: WriteCondition::from_read(current.metafield.as_ref()),
            };

            match self.admin.metafields_set(write).await {
                Ok(_) => return Ok(true),
                Err(AdminShopifyError::StaleMetafield(key)) => {
                    tracing::warn!(%key, attempt, "Installed sections changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(MetafieldError::Conflict {
            key: format!("{NAMESPACE}.{INSTALLED_SECTIONS_KEY}"),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }
}

/// Decode the stored id list, dropping duplicates and non-string entries.
fn decode_ids(raw: &str) -> Vec<String> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(error = %e, "Installed sections metafield is not a JSON array, treating as empty");
            return Vec::new();
        }
    };

    let mut ids: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if let serde_json::Value::String(id) = value
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}
