//! CLI command implementations.

pub mod migrate;
pub mod sections;
pub mod sessions;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by the database-backed commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored session could not be read or written.
    #[error("Repository error: {0}")]
    Repository(#[from] shopi_section_app::db::RepositoryError),

    /// Shop domain did not parse.
    #[error("Invalid shop domain: {0}")]
    InvalidShop(String),

    /// No catalog section with that id.
    #[error("Unknown section: {0}")]
    UnknownSection(String),
}

/// Connect to the database named by `DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(shopi_section_app::db::create_pool(&database_url).await?)
}
