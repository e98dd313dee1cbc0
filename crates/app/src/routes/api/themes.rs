//! Theme listing endpoint.

use axum::{Json, extract::Query};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::ShopContext;
use crate::services::themes::{self, ThemeListing};

#[derive(Debug, Deserialize)]
pub struct ThemesQuery {
    /// Check each theme's assets instead of trusting the shop-wide flag.
    #[serde(default)]
    pub probe: bool,
}

/// GET /api/themes - Themes with installed sections.
///
/// # Errors
///
/// Returns 401 with reauthorize headers if Shopify rejects the token, or
/// 502 if Shopify fails.
#[instrument(skip(ctx), fields(shop = %ctx.shop))]
pub async fn list(
    ctx: ShopContext,
    Query(query): Query<ThemesQuery>,
) -> Result<Json<ThemeListing>, AppError> {
    let listing = ctx
        .guard(themes::list(&ctx.admin, ctx.locks(), query.probe).await)
        .await?;
    Ok(Json(listing))
}
