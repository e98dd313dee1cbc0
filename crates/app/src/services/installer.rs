//! Section activation and deactivation.
//!
//! # Upload chain
//!
//! Theme writes fail in store-specific ways (REST 404 on some API versions,
//! `themeFilesUpsert` rejecting some filenames), so the Liquid is uploaded
//! through an ordered list of methods, stopping at the first success:
//!
//! 1. REST `PUT` with the primary API version
//! 2. REST `PUT` with the fallback API version
//! 3. GraphQL `themeFilesUpsert`
//! 4. GraphQL `themeFilesUpsert` with a simplified filename
//!
//! Only a 404, a 5xx or a mutation user error advances the chain. Anything
//! else, a rejected token included, stops it immediately.

use serde::Serialize;
use shopi_section_core::{AssetKey, AssetKeyError, ThemeId};
use thiserror::Error;
use tracing::instrument;

use super::metafields::{InstalledSections, MetafieldError, ShopLocks};
use super::theme_editor::{self, TemplateError};
use crate::sections::{self, Section};
use crate::shopify::{AdminShopifyError, ShopAdmin};

/// Errors from section activation and deactivation.
#[derive(Debug, Error)]
pub enum SectionError {
    /// Section id is not in the catalog.
    #[error("unknown section: {0}")]
    UnknownSection(String),

    /// Every upload method failed.
    #[error("all upload methods failed; last error: {last}")]
    UploadFailed {
        /// Error from the final method tried.
        last: AdminShopifyError,
    },

    /// Shopify call failed.
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    /// Installed-sections metafield update failed.
    #[error(transparent)]
    Metafield(#[from] MetafieldError),

    /// Catalog id does not form a valid asset key.
    #[error("invalid asset key: {0}")]
    AssetKey(#[from] AssetKeyError),
}

impl SectionError {
    /// Whether the shop must re-run OAuth.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        match self {
            Self::Shopify(e) | Self::UploadFailed { last: e } => e.requires_reauth(),
            Self::Metafield(e) => e.requires_reauth(),
            Self::UnknownSection(_) | Self::AssetKey(_) => false,
        }
    }
}

/// How the Liquid reached the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMethod {
    /// REST asset `PUT`, primary API version.
    Rest,
    /// REST asset `PUT`, fallback API version.
    RestFallbackVersion,
    /// GraphQL `themeFilesUpsert`.
    Graphql,
    /// GraphQL `themeFilesUpsert` under a simplified filename.
    GraphqlSimplifiedFilename,
}

impl UploadMethod {
    /// Chain order.
    pub const CHAIN: [Self; 4] = [
        Self::Rest,
        Self::RestFallbackVersion,
        Self::Graphql,
        Self::GraphqlSimplifiedFilename,
    ];
}

/// Result of an activation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    /// Section that was activated.
    pub section_id: &'static str,
    /// Method that stored the Liquid.
    pub upload_method: UploadMethod,
    /// Whether the installed-sections metafield changed.
    pub recorded: bool,
    /// Whether an instance was added to the home page.
    pub placed_on_home: bool,
}

/// Result of a deactivation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deactivation {
    /// Section that was deactivated.
    pub section_id: String,
    /// Whether the theme asset existed.
    pub asset_deleted: bool,
    /// Whether the installed-sections metafield changed.
    pub unrecorded: bool,
    /// Whether instances were removed from the home page.
    pub removed_from_home: bool,
}

/// Installs catalog sections into a shop's themes.
pub struct SectionInstaller<'a> {
    admin: &'a ShopAdmin,
    locks: &'a ShopLocks,
}

impl<'a> SectionInstaller<'a> {
    /// Bind the installer to a shop.
    #[must_use]
    pub const fn new(admin: &'a ShopAdmin, locks: &'a ShopLocks) -> Self {
        Self { admin, locks }
    }

    /// Write the section into the theme and record it.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::UnknownSection` before any network call if the
    /// id is not in the catalog, and `SectionError::UploadFailed` if every
    /// upload method failed.
    #[instrument(skip(self), fields(shop = %self.admin.shop_domain(), theme_id = %theme_id))]
    pub async fn activate(
        &self,
        theme_id: ThemeId,
        section_id: &str,
    ) -> Result<Activation, SectionError> {
        let section = sections::lookup(section_id)
            .ok_or_else(|| SectionError::UnknownSection(section_id.to_string()))?;

        let liquid = section.liquid_with_presets();
        let upload_method = self.upload(theme_id, section, &liquid).await?;

        let recorded = InstalledSections::new(self.admin, self.locks)
            .add(section.id)
            .await?;

        let placed_on_home = swallow_template_error(
            theme_editor::activate_on_home(self.admin, theme_id, section.id).await,
            section.id,
        )?;

        tracing::info!(section_id = section.id, ?upload_method, recorded, placed_on_home, "Section activated");

        Ok(Activation {
            section_id: section.id,
            upload_method,
            recorded,
            placed_on_home,
        })
    }

    /// Remove the section from the theme and forget it.
    ///
    /// Deactivating a section that is not installed succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::UnknownSection` before any network call if the
    /// id is not in the catalog.
    #[instrument(skip(self), fields(shop = %self.admin.shop_domain(), theme_id = %theme_id))]
    pub async fn deactivate(
        &self,
        theme_id: ThemeId,
        section_id: &str,
    ) -> Result<Deactivation, SectionError> {
        let section = sections::lookup(section_id)
            .ok_or_else(|| SectionError::UnknownSection(section_id.to_string()))?;

        let asset_deleted = self
            .admin
            .delete_asset(theme_id, &section.asset_key()?)
            .await?;

        let removed_from_home = swallow_template_error(
            theme_editor::deactivate_on_home(self.admin, theme_id, section.id).await,
            section.id,
        )?;

        let unrecorded = InstalledSections::new(self.admin, self.locks)
            .remove(section.id)
            .await?;

        tracing::info!(
            section_id = section.id,
            asset_deleted,
            unrecorded,
            removed_from_home,
            "Section deactivated"
        );

        Ok(Deactivation {
            section_id: section.id.to_string(),
            asset_deleted,
            unrecorded,
            removed_from_home,
        })
    }

    /// Run the upload chain, returning the method that succeeded.
    async fn upload(
        &self,
        theme_id: ThemeId,
        section: &Section,
        liquid: &str,
    ) -> Result<UploadMethod, SectionError> {
        let key = section.asset_key()?;
        let mut last_error = None;

        for method in UploadMethod::CHAIN {
            match self.upload_with(method, theme_id, section, &key, liquid).await {
                Ok(()) => return Ok(method),
                Err(e) if e.is_upload_fallback_candidate() => {
                    tracing::warn!(?method, error = %e, "Section upload failed, trying next method");
                    last_error = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SectionError::UploadFailed {
            last: last_error.unwrap_or_else(|| {
                AdminShopifyError::UserError("no upload method attempted".to_string())
            }),
        })
    }

    async fn upload_with(
        &self,
        method: UploadMethod,
        theme_id: ThemeId,
        section: &Section,
        key: &AssetKey,
        liquid: &str,
    ) -> Result<(), AdminShopifyError> {
        match method {
            UploadMethod::Rest => self
                .admin
                .put_asset(theme_id, key, liquid)
                .await
                .map(drop),
            UploadMethod::RestFallbackVersion => self
                .admin
                .put_asset_with_version(
                    self.admin.client().fallback_api_version(),
                    theme_id,
                    key,
                    liquid,
                )
                .await
                .map(drop),
            UploadMethod::Graphql => {
                self.admin
                    .theme_files_upsert(theme_id, key.as_str(), liquid)
                    .await
            }
            UploadMethod::GraphqlSimplifiedFilename => {
                self.admin
                    .theme_files_upsert(theme_id, &section.simplified_filename(), liquid)
                    .await
            }
        }
    }
}

/// Log and drop home-template failures, except a rejected token.
fn swallow_template_error(
    result: Result<bool, TemplateError>,
    section_id: &str,
) -> Result<bool, SectionError> {
    match result {
        Ok(changed) => Ok(changed),
        Err(TemplateError::Shopify(e)) if e.requires_reauth() => Err(e.into()),
        Err(e) => {
            tracing::warn!(section_id, error = %e, "Failed to update home template");
            Ok(false)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ShopifyAppConfig;
    use crate::shopify::AdminClient;
    use httpmock::Method::{DELETE, GET, POST, PUT};
    use httpmock::MockServer;
    use secrecy::SecretString;
    use serde_json::json;
    use shopi_section_core::ShopDomain;
    use url::Url;

    fn admin_for(server: &MockServer) -> ShopAdmin {
        let mut config = ShopifyAppConfig::new("client-id", SecretString::from("client-secret"));
        config.endpoint_override = Some(Url::parse(&server.base_url()).unwrap());
        AdminClient::new(&config).shop(
            &ShopDomain::parse("demo.myshopify.com").unwrap(),
            &SecretString::from("shpat_test"),
        )
    }

    async fn mock_metafields(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/api/2025-01/graphql.json")
                    .body_contains("GetShopMetafield");
                then.status(200).json_body(json!({
                    "data": {"shop": {"id": "gid://shopify/Shop/1", "metafield": null}}
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/api/2025-01/graphql.json")
                    .body_contains("MetafieldsSet");
                then.status(200).json_body(json!({
                    "data": {"metafieldsSet": {
                        "metafields": [{"key": "installed_sections", "namespace": "shopi_section", "value": "[]", "compareDigest": "d1"}],
                        "userErrors": []
                    }}
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/admin/api/2025-01/themes/5/assets.json")
                    .query_param("asset[key]", "templates/index.json");
                then.status(404);
            })
            .await;
    }

    #[tokio::test]
    async fn test_unknown_section_makes_no_calls() {
        let server = MockServer::start_async().await;
        let catch_all = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(500);
            })
            .await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let err = SectionInstaller::new(&admin, &locks)
            .activate(ThemeId::new(5), "nope")
            .await
            .unwrap_err();

        assert!(matches!(err, SectionError::UnknownSection(_)));
        assert_eq!(catch_all.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_fallback_version_used_after_404() {
        let server = MockServer::start_async().await;
        let primary = server
            .mock_async(|when, then| {
                when.method(PUT).path("/admin/api/2025-01/themes/5/assets.json");
                then.status(404);
            })
            .await;
        let fallback = server
            .mock_async(|when, then| {
                when.method(PUT).path("/admin/api/2024-10/themes/5/assets.json");
                then.status(200)
                    .json_body(json!({"asset": {"key": "sections/3d-carousel-pro.liquid"}}));
            })
            .await;
        mock_metafields(&server).await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let activation = SectionInstaller::new(&admin, &locks)
            .activate(ThemeId::new(5), "3d-carousel-pro")
            .await
            .unwrap();

        assert_eq!(activation.upload_method, UploadMethod::RestFallbackVersion);
        assert!(activation.recorded);
        assert!(!activation.placed_on_home);
        primary.assert_hits_async(1).await;
        fallback.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_unauthorized_stops_chain() {
        let server = MockServer::start_async().await;
        let primary = server
            .mock_async(|when, then| {
                when.method(PUT).path("/admin/api/2025-01/themes/5/assets.json");
                then.status(401);
            })
            .await;
        let fallback = server
            .mock_async(|when, then| {
                when.method(PUT).path("/admin/api/2024-10/themes/5/assets.json");
                then.status(200);
            })
            .await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let err = SectionInstaller::new(&admin, &locks)
            .activate(ThemeId::new(5), "my-custom-section")
            .await
            .unwrap_err();

        assert!(err.requires_reauth());
        primary.assert_hits_async(1).await;
        fallback.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_last_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT);
                then.status(404);
            })
            .await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/api/2025-01/graphql.json")
                    .body_contains("ThemeFilesUpsert");
                then.status(200).json_body(json!({
                    "data": {"themeFilesUpsert": {
                        "upsertedThemeFiles": [],
                        "userErrors": [{"filename": null, "code": "INVALID", "message": "Filename is invalid"}]
                    }}
                }));
            })
            .await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let err = SectionInstaller::new(&admin, &locks)
            .activate(ThemeId::new(5), "my-custom-section")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SectionError::UploadFailed {
                last: AdminShopifyError::UserError(_)
            }
        ));
        graphql.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_graphql_errors_stop_chain() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT);
                then.status(404);
            })
            .await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/api/2025-01/graphql.json")
                    .body_contains("ThemeFilesUpsert");
                then.status(200).json_body(json!({
                    "errors": [{"message": "Access denied for themeFilesUpsert field."}]
                }));
            })
            .await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let err = SectionInstaller::new(&admin, &locks)
            .activate(ThemeId::new(5), "my-custom-section")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SectionError::Shopify(AdminShopifyError::GraphQL(_))
        ));
        graphql.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_unprocessable_asset_skips_fallback_version() {
        let server = MockServer::start_async().await;
        let primary = server
            .mock_async(|when, then| {
                when.method(PUT).path("/admin/api/2025-01/themes/5/assets.json");
                then.status(422)
                    .json_body(json!({"errors": {"asset": ["Liquid syntax error"]}}));
            })
            .await;
        let fallback = server
            .mock_async(|when, then| {
                when.method(PUT).path("/admin/api/2024-10/themes/5/assets.json");
                then.status(200);
            })
            .await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST).body_contains("ThemeFilesUpsert");
                then.status(200);
            })
            .await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let err = SectionInstaller::new(&admin, &locks)
            .activate(ThemeId::new(5), "my-custom-section")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SectionError::Shopify(AdminShopifyError::Status { status: 422, .. })
        ));
        primary.assert_hits_async(1).await;
        fallback.assert_hits_async(0).await;
        graphql.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_deactivate_missing_asset_succeeds() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/admin/api/2025-01/themes/5/assets.json");
                then.status(404);
            })
            .await;
        let write = server
            .mock_async(|when, then| {
                when.method(POST).body_contains("MetafieldsSet");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).body_contains("GetShopMetafield");
                then.status(200).json_body(json!({
                    "data": {"shop": {"id": "gid://shopify/Shop/1", "metafield": {
                        "id": "gid://shopify/Metafield/9", "value": "[\"3d-carousel-pro\"]", "compareDigest": "d"
                    }}}
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/api/2025-01/themes/5/assets.json");
                then.status(404);
            })
            .await;

        let admin = admin_for(&server);
        let locks = ShopLocks::new();
        let result = SectionInstaller::new(&admin, &locks)
            .deactivate(ThemeId::new(5), "my-custom-section")
            .await
            .unwrap();

        assert!(!result.asset_deleted);
        assert!(!result.unrecorded);
        write.assert_hits_async(0).await;
    }
}
