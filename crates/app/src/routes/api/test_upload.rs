//! Theme access diagnostics endpoint.

use axum::{
    Form, Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use shopi_section_core::ThemeId;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::ShopContext;
use crate::services::diagnostics;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestUploadForm {
    pub theme_id: Option<String>,
}

/// POST /api/test-upload - Run the theme access diagnostics.
///
/// Answers 200 when every step passes and 500 with the same report shape
/// when one fails.
///
/// # Errors
///
/// Returns 400 without a valid `themeId`, or 401 with reauthorize headers
/// if Shopify rejects the token.
#[instrument(skip(ctx, form), fields(shop = %ctx.shop))]
pub async fn test_upload(
    ctx: ShopContext,
    Form(form): Form<TestUploadForm>,
) -> Result<Response, AppError> {
    let theme_id = form
        .theme_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing themeId".to_string()))?
        .parse::<ThemeId>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = ctx.guard(diagnostics::run(&ctx.admin, theme_id).await).await?;
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok((status, Json(report)).into_response())
}
