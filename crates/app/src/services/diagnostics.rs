//! Theme access diagnostics.
//!
//! Runs the same calls an install needs, one at a time, and reports where
//! the first failure happens. Useful when a store rejects section uploads.

use serde::Serialize;
use shopi_section_core::{AssetKey, ThemeId};
use tracing::instrument;

use crate::shopify::{AdminShopifyError, ShopAdmin};

/// Asset read by the second step; every theme has one.
pub const PROBE_ASSET: &str = "layout/theme.liquid";

/// File written by the third step.
pub const TEST_SECTION_FILENAME: &str = "sections/shopi-test.liquid";

/// Scope needed to write theme files.
pub const WRITE_THEMES_SCOPE: &str = "write_themes";

const TEST_SECTION_LIQUID: &str = r#"{% schema %}
{
  "name": "Test Section",
  "settings": []
}
{% endschema %}
<div>Test from Shopi Section - uploaded via GraphQL</div>
"#;

/// Granted-scope report. Never fails the run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeReport {
    /// Scopes granted to the installation.
    pub granted: Vec<String>,
    /// Whether `write_themes` is missing.
    pub missing_write_themes: bool,
    /// Why the scopes could not be read, if they could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// What the step does.
    pub name: &'static str,
    /// Whether it succeeded.
    pub success: bool,
    /// HTTP status Shopify answered with, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Human-readable detail.
    pub detail: String,
}

/// Per-step results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResults {
    pub scopes: ScopeReport,
    pub test1: Option<StepReport>,
    pub test2: Option<StepReport>,
    pub test3: Option<StepReport>,
    pub summary: String,
}

/// Full diagnostics report.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub success: bool,
    pub message: String,
    pub results: DiagnosticsResults,
}

/// Run the diagnostics against one theme.
///
/// # Errors
///
/// Only a rejected token is returned as an error; every other failure is
/// recorded in the report.
#[instrument(skip(admin), fields(shop = %admin.shop_domain(), theme_id = %theme_id))]
pub async fn run(
    admin: &ShopAdmin,
    theme_id: ThemeId,
) -> Result<DiagnosticsReport, AdminShopifyError> {
    let mut results = DiagnosticsResults {
        scopes: check_scopes(admin).await?,
        test1: None,
        test2: None,
        test3: None,
        summary: String::new(),
    };

    let step = step_result(
        "Fetch theme",
        admin
            .get_theme(theme_id)
            .await
            .map(|t| format!("Theme \"{}\" ({:?}) is accessible", t.name, t.role)),
    )?;
    let passed = step.success;
    results.test1 = Some(step);
    if !passed {
        return Ok(failed(results, "Test 1 failed: theme not accessible"));
    }

    let probe_key = AssetKey::parse(PROBE_ASSET)
        .map_err(|e| AdminShopifyError::UserError(e.to_string()))?;
    let step = step_result(
        "Read theme asset",
        match admin.get_asset(theme_id, &probe_key).await {
            Ok(Some(asset)) => Ok(format!(
                "Read {} ({} bytes)",
                asset.key,
                asset.value.as_deref().map_or(0, str::len)
            )),
            Ok(None) => Err(AdminShopifyError::NotFound(PROBE_ASSET.to_string())),
            Err(e) => Err(e),
        },
    )?;
    let passed = step.success;
    results.test2 = Some(step);
    if !passed {
        return Ok(failed(results, "Test 2 failed: cannot read theme assets"));
    }

    let step = step_result(
        "Upload via GraphQL",
        admin
            .theme_files_upsert(theme_id, TEST_SECTION_FILENAME, TEST_SECTION_LIQUID)
            .await
            .map(|()| format!("Uploaded {TEST_SECTION_FILENAME}")),
    )?;
    let passed = step.success;
    let detail = step.detail.clone();
    results.test3 = Some(step);
    if !passed {
        return Ok(failed(results, &format!("Test 3 failed: {detail}")));
    }

    results.summary = "All tests passed: theme accessible and GraphQL upload works".to_string();
    tracing::info!("Theme diagnostics passed");
    Ok(DiagnosticsReport {
        success: true,
        message: "All tests passed".to_string(),
        results,
    })
}

/// Step 0: which scopes the token actually has.
async fn check_scopes(admin: &ShopAdmin) -> Result<ScopeReport, AdminShopifyError> {
    let granted = match admin.access_scopes().await {
        Ok(scopes) => Ok(scopes),
        Err(e) if e.requires_reauth() => return Err(e),
        Err(rest_error) => {
            tracing::debug!(error = %rest_error, "REST access scopes failed, asking GraphQL");
            admin.app_access_scopes().await
        }
    };

    match granted {
        Ok(granted) => Ok(ScopeReport {
            missing_write_themes: !granted.iter().any(|s| s == WRITE_THEMES_SCOPE),
            granted,
            error: None,
        }),
        Err(e) if e.requires_reauth() => Err(e),
        Err(e) => Ok(ScopeReport {
            granted: Vec::new(),
            missing_write_themes: true,
            error: Some(e.to_string()),
        }),
    }
}

/// Turn a call result into a step report, propagating a rejected token.
fn step_result(
    name: &'static str,
    result: Result<String, AdminShopifyError>,
) -> Result<StepReport, AdminShopifyError> {
    match result {
        Ok(detail) => Ok(StepReport {
            name,
            success: true,
            status: Some(200),
            detail,
        }),
        Err(e) if e.requires_reauth() => Err(e),
        Err(e) => {
            tracing::warn!(step = name, error = %e, "Diagnostics step failed");
            Ok(StepReport {
                name,
                success: false,
                status: status_of(&e),
                detail: e.to_string(),
            })
        }
    }
}

fn failed(mut results: DiagnosticsResults, message: &str) -> DiagnosticsReport {
    results.summary = message.to_string();
    DiagnosticsReport {
        success: false,
        message: message.to_string(),
        results,
    }
}

const fn status_of(error: &AdminShopifyError) -> Option<u16> {
    match error {
        AdminShopifyError::Status { status, .. } => Some(*status),
        AdminShopifyError::NotFound(_) => Some(404),
        AdminShopifyError::RateLimited(_) => Some(429),
        AdminShopifyError::Unauthorized(_) => Some(401),
        AdminShopifyError::Forbidden(_) => Some(403),
        _ => None,
    }
}
