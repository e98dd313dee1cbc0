//! Session middleware configuration.
//!
//! Cookie sessions only carry the OAuth `state` between `/auth/login` and
//! `/auth/callback`, so they are short-lived.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shopi_section_session";

/// Session expiry time in seconds (1 hour).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

const SESSION_SCHEMA: &str = "shopi_section";
const SESSION_TABLE: &str = "session";

/// Error building the session store.
#[derive(Debug, thiserror::Error)]
#[error("invalid session store configuration: {0}")]
pub struct SessionLayerError(String);

/// Create the session layer with the `PostgreSQL` store.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected by the store.
pub fn create_session_layer(
    pool: &PgPool,
    config: &AppConfig,
) -> Result<SessionManagerLayer<PostgresStore>, SessionLayerError> {
    // The session table is created by migration in the shopi_section schema
    let store = PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .map_err(SessionLayerError)?
        .with_table_name(SESSION_TABLE)
        .map_err(SessionLayerError)?;

    Ok(session_layer(store, config))
}

/// Apply the cookie settings to any store.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(
    store: S,
    config: &AppConfig,
) -> SessionManagerLayer<S> {
    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        // Lax so the cookie survives the top-level redirect back from Shopify
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
