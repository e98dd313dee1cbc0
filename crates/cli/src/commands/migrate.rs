//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shopi-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/app/migrations/` and create the
//! `shopi_section` schema with the shop session and cookie session tables.

use super::{CommandError, connect};

/// Run the app's migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../app/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
