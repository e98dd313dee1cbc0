//! Offline shop session commands.
//!
//! # Usage
//!
//! ```bash
//! shopi-cli sessions list
//! shopi-cli sessions delete example.myshopify.com
//! ```

use shopi_section_app::db::{PgSessionStorage, SessionStorage};
use shopi_section_core::ShopDomain;

use super::{CommandError, connect};

/// Print every installed shop with its scopes.
///
/// # Errors
///
/// Returns an error if the sessions cannot be read.
pub async fn list() -> Result<(), CommandError> {
    let storage = PgSessionStorage::new(connect().await?);
    let sessions = storage.list().await?;

    #[allow(clippy::print_stdout)]
    {
        if sessions.is_empty() {
            println!("No installed shops");
        }
        for session in &sessions {
            println!(
                "{}\tinstalled {}\tupdated {}\t{}",
                session.shop,
                session.created_at.format("%Y-%m-%d %H:%M"),
                session.updated_at.format("%Y-%m-%d %H:%M"),
                session.scope()
            );
        }
    }
    Ok(())
}

/// Delete a shop's offline session.
///
/// The next embedded request from that shop goes through OAuth again.
///
/// # Errors
///
/// Returns an error if the domain is invalid or the delete fails.
pub async fn delete(shop: &str) -> Result<(), CommandError> {
    let shop = ShopDomain::parse(shop).map_err(|e| CommandError::InvalidShop(e.to_string()))?;
    let storage = PgSessionStorage::new(connect().await?);

    if storage.delete(&shop).await? {
        tracing::info!(shop = %shop, "Session deleted");
    } else {
        tracing::warn!(shop = %shop, "No session stored for shop");
    }
    Ok(())
}
