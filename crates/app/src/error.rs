//! Unified error handling for the app.

use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use shopi_section_core::ShopDomain;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::SessionTokenError;
use crate::services::installer::SectionError;
use crate::services::metafields::MetafieldError;
use crate::shopify::AdminShopifyError;

/// Set on a 401 when the shop must re-run OAuth.
pub const REAUTHORIZE_HEADER: HeaderName =
    HeaderName::from_static("x-shopify-api-request-failure-reauthorize");

/// Where the shop should go to re-run OAuth.
pub const REAUTHORIZE_URL_HEADER: HeaderName =
    HeaderName::from_static("x-shopify-api-request-failure-reauthorize-url");

/// Asks App Bridge to retry with a fresh session token.
pub const RETRY_INVALID_SESSION_HEADER: HeaderName =
    HeaderName::from_static("x-shopify-retry-invalid-session-request");

/// Login URL that restarts OAuth for `shop`.
#[must_use]
pub fn reauthorize_url(shop: &ShopDomain) -> String {
    format!("/auth/login?shop={}", urlencoding::encode(shop.as_str()))
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Section install or uninstall failed.
    #[error("{0}")]
    Section(#[from] SectionError),

    /// Metafield store failed.
    #[error("{0}")]
    Metafield(#[from] MetafieldError),

    /// Session token rejected.
    #[error("{0}")]
    SessionToken(#[from] SessionTokenError),

    /// The shop has no usable offline session.
    #[error("Shop {shop} must reauthorize")]
    Reauthorize {
        /// Shop to send through OAuth.
        shop: ShopDomain,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error means Shopify rejected the shop's token.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        match self {
            Self::Shopify(e) => e.requires_reauth(),
            Self::Section(e) => e.requires_reauth(),
            Self::Metafield(e) => e.requires_reauth(),
            Self::Reauthorize { .. } => true,
            _ => false,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(e) => shopify_status(e),
            Self::Section(e) => match e {
                SectionError::UnknownSection(_) => StatusCode::BAD_REQUEST,
                SectionError::UploadFailed { last } if last.requires_reauth() => {
                    StatusCode::UNAUTHORIZED
                }
                SectionError::UploadFailed { .. } => StatusCode::BAD_GATEWAY,
                SectionError::Shopify(e) => shopify_status(e),
                SectionError::Metafield(e) => metafield_status(e),
                SectionError::AssetKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metafield(e) => metafield_status(e),
            Self::SessionToken(_) | Self::Reauthorize { .. } | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

const fn shopify_status(error: &AdminShopifyError) -> StatusCode {
    match error {
        AdminShopifyError::Unauthorized(_) | AdminShopifyError::Forbidden(_) => {
            StatusCode::UNAUTHORIZED
        }
        AdminShopifyError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

const fn metafield_status(error: &MetafieldError) -> StatusCode {
    match error {
        MetafieldError::Shopify(e) => shopify_status(e),
        MetafieldError::Conflict { .. } => StatusCode::CONFLICT,
        MetafieldError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Section(SectionError::AssetKey(_))
            | Self::Metafield(MetafieldError::Encode(_)) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        let headers = response.headers_mut();
        match &self {
            Self::Reauthorize { shop } => {
                headers.insert(REAUTHORIZE_HEADER, HeaderValue::from_static("1"));
                if let Ok(url) = HeaderValue::from_str(&reauthorize_url(shop)) {
                    headers.insert(REAUTHORIZE_URL_HEADER, url);
                }
            }
            Self::SessionToken(_) => {
                headers.insert(RETRY_INVALID_SESSION_HEADER, HeaderValue::from_static("1"));
            }
            Self::Shopify(AdminShopifyError::RateLimited(secs))
            | Self::Metafield(MetafieldError::Shopify(AdminShopifyError::RateLimited(secs))) => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(*secs));
            }
            _ => {}
        }
        response
    }
}

/// Error from a page handler.
///
/// Same as [`AppError`] except that a shop which must reauthorize is sent
/// to the login page instead of receiving a 401.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::Reauthorize { shop } => {
                Redirect::to(&format!("{}&embedded=1", reauthorize_url(&shop))).into_response()
            }
            other => other.into_response(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("theme 42".to_string());
        assert_eq!(err.to_string(), "Not found: theme 42");

        let err = AppError::BadRequest("missing themeId".to_string());
        assert_eq!(err.to_string(), "Bad request: missing themeId");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Section(SectionError::UnknownSection("x".to_string()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Metafield(MetafieldError::Conflict {
                key: "shopi_section.installed_sections".to_string(),
                attempts: 3,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Section(SectionError::UploadFailed {
                last: AdminShopifyError::Status {
                    status: 500,
                    body: String::new(),
                },
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Shopify(AdminShopifyError::NotFound(
                "themes/1.json".to_string()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::SessionToken(SessionTokenError::Missing)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_reauthorize_headers() {
        let shop = ShopDomain::parse("cool-store.myshopify.com").unwrap();
        let response = AppError::Reauthorize { shop }.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[REAUTHORIZE_HEADER], "1");
        assert_eq!(
            response.headers()[REAUTHORIZE_URL_HEADER],
            "/auth/login?shop=cool-store.myshopify.com"
        );
    }

    #[test]
    fn test_page_error_redirects_to_login() {
        let shop = ShopDomain::parse("cool-store.myshopify.com").unwrap();
        let response = PageError(AppError::Reauthorize { shop }).into_response();

        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?shop=cool-store.myshopify.com&embedded=1"
        );
    }

    #[test]
    fn test_requires_reauth() {
        assert!(
            AppError::Shopify(AdminShopifyError::Forbidden("x".to_string())).requires_reauth()
        );
        assert!(!AppError::BadRequest("x".to_string()).requires_reauth());
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = AppError::Internal("db password leaked".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
