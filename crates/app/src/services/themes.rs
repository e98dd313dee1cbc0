//! Theme listing with section installation status.

use futures::future::join_all;
use serde::Serialize;
use shopi_section_core::ThemeId;
use tracing::instrument;

use super::metafields::{InstalledSections, MetafieldError, ShopLocks};
use crate::sections::CATALOG;
use crate::shopify::{AdminShopifyError, ShopAdmin, Theme, ThemeRole};

/// A theme with the catalog sections installed in it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStatus {
    pub id: ThemeId,
    pub name: String,
    pub role: ThemeRole,
    pub processing: bool,
    pub installed_sections: Vec<String>,
}

/// Response of the theme listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeListing {
    pub themes: Vec<ThemeStatus>,
    /// Shop-wide installed-sections flag.
    pub installed_sections: Vec<String>,
}

/// List the shop's themes.
///
/// Without `probe`, the metafield flag is reported for the main theme only.
/// With `probe`, every theme's catalog assets are checked concurrently.
///
/// # Errors
///
/// Returns an error if the themes or the metafield cannot be read.
#[instrument(skip(admin, locks), fields(shop = %admin.shop_domain()))]
pub async fn list(
    admin: &ShopAdmin,
    locks: &ShopLocks,
    probe: bool,
) -> Result<ThemeListing, MetafieldError> {
    let themes = admin.list_themes().await?;
    let installed = InstalledSections::new(admin, locks).list().await?;

    let statuses = if probe {
        join_all(themes.into_iter().map(|theme| async move {
            let found = probe_theme(admin, theme.id).await?;
            Ok::<_, AdminShopifyError>(status(theme, found))
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?
    } else {
        themes
            .into_iter()
            .map(|theme| {
                let found = if theme.is_main() {
                    installed.clone()
                } else {
                    Vec::new()
                };
                status(theme, found)
            })
            .collect()
    };

    Ok(ThemeListing {
        themes: statuses,
        installed_sections: installed,
    })
}

fn status(theme: Theme, installed_sections: Vec<String>) -> ThemeStatus {
    ThemeStatus {
        id: theme.id,
        name: theme.name,
        role: theme.role,
        processing: theme.processing,
        installed_sections,
    }
}

/// Catalog sections whose asset exists in the theme.
async fn probe_theme(
    admin: &ShopAdmin,
    theme_id: ThemeId,
) -> Result<Vec<String>, AdminShopifyError> {
    let checks = CATALOG.iter().map(|section| async move {
        let key = section
            .asset_key()
            .map_err(|e| AdminShopifyError::UserError(e.to_string()))?;
        let exists = admin.get_asset(theme_id, &key).await?.is_some();
        Ok::<_, AdminShopifyError>(exists.then_some(section.id))
    });

    let mut found = Vec::new();
    for result in join_all(checks).await {
        if let Some(id) = result? {
            found.push(id.to_string());
        }
    }
    Ok(found)
}
