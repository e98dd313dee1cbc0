//! Shop session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use shopi_section_core::ShopDomain;
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::{RepositoryError, SessionStorage};
use crate::config::parse_scopes;
use crate::models::ShopSession;

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopSessionRow {
    id: String,
    shop: String,
    access_token: String,
    scope: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopSessionRow> for ShopSession {
    type Error = RepositoryError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop in session {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            shop,
            access_token: SecretString::from(row.access_token),
            scopes: parse_scopes(&row.scope),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// Session storage backed by `shopi_section.shop_session`.
#[derive(Debug, Clone)]
pub struct PgSessionStorage {
    pool: PgPool,
}

impl PgSessionStorage {
    /// Create a new session storage.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStorage for PgSessionStorage {
    async fn load(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT id, shop, access_token, scope, created_at, updated_at
            FROM shopi_section.shop_session
            WHERE id = $1
            ",
        )
        .bind(ShopSession::offline_id(shop))
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShopSession::try_from).transpose()
    }

    async fn store(&self, session: &ShopSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shopi_section.shop_session (id, shop, access_token, scope)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = now()
            ",
        )
        .bind(&session.id)
        .bind(&session.shop)
        .bind(session.access_token.expose_secret())
        .bind(session.scope())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shopi_section.shop_session
            WHERE id = $1
            ",
        )
        .bind(ShopSession::offline_id(shop))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<ShopSession>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT id, shop, access_token, scope, created_at, updated_at
            FROM shopi_section.shop_session
            ORDER BY created_at
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ShopSession::try_from).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Session storage kept in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    sessions: RwLock<HashMap<String, ShopSession>>,
}

impl MemorySessionStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&ShopSession::offline_id(shop))
            .cloned())
    }

    async fn store(&self, session: &ShopSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let mut session = session.clone();
        if let Some(existing) = sessions.get(&session.id) {
            session.created_at = existing.created_at;
            session.updated_at = Utc::now();
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        Ok(self
            .sessions
            .write()
            .await
            .remove(&ShopSession::offline_id(shop))
            .is_some())
    }

    async fn list(&self) -> Result<Vec<ShopSession>, RepositoryError> {
        let mut sessions: Vec<ShopSession> =
            self.sessions.read().await.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}
