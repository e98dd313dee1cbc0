//! Database operations for the app `PostgreSQL`.
//!
//! # Schema: `shopi_section`
//!
//! ## Tables
//!
//! - `shop_session` - Offline Shopify access tokens, one per installed shop
//! - `session` - Cookie sessions (OAuth state only)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/app/migrations/` and run via:
//! ```bash
//! cargo run -p shopi-section-cli -- migrate
//! ```

pub mod sessions;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use shopi_section_core::ShopDomain;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::models::ShopSession;

pub use sessions::{MemorySessionStorage, PgSessionStorage};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Persistence for offline shop sessions.
///
/// The Postgres implementation backs the server; the in-memory one backs
/// tests and local tooling.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the session for a shop.
    async fn load(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError>;

    /// Insert or replace the session for `session.shop`.
    async fn store(&self, session: &ShopSession) -> Result<(), RepositoryError>;

    /// Delete the session for a shop. Returns whether a row existed.
    async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError>;

    /// All stored sessions, oldest first.
    async fn list(&self) -> Result<Vec<ShopSession>, RepositoryError>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
