//! Shop context extractor for embedded requests.
//!
//! Every embedded request carries an App Bridge session token, either as
//! `Authorization: Bearer <token>` (fetches) or as the `id_token` query
//! parameter (the admin's first page load). The token names the shop; the
//! shop's offline session supplies the Admin API token.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use shopi_section_core::ShopDomain;

use super::security_headers::shop_from_query;
use crate::error::{AppError, PageError};
use crate::models::ShopSession;
use crate::services::{SessionTokenError, ShopLocks, verify_session_token};
use crate::shopify::ShopAdmin;
use crate::state::AppState;

/// An authenticated shop with a usable Admin API client.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ctx: ShopContext) -> Result<Json<Vec<Theme>>, AppError> {
///     let themes = ctx.guard(ctx.admin.list_themes().await).await?;
///     Ok(Json(themes))
/// }
/// ```
pub struct ShopContext {
    /// Shop the session token was issued for.
    pub shop: ShopDomain,
    /// The shop's offline session.
    pub session: ShopSession,
    /// Admin API client bound to the shop.
    pub admin: ShopAdmin,
    /// Base64 admin host from the query, passed back to App Bridge.
    pub host: Option<String>,
    /// Whether the caller expects JSON rather than a page.
    pub wants_json: bool,
    state: AppState,
}

impl std::fmt::Debug for ShopContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopContext")
            .field("shop", &self.shop)
            .field("host", &self.host)
            .field("wants_json", &self.wants_json)
            .finish_non_exhaustive()
    }
}

impl ShopContext {
    /// Pass a result through, turning a rejected token into a reauthorize
    /// signal.
    ///
    /// When Shopify answers 401 or 403 the stored token is useless, so the
    /// shop's session is deleted before returning
    /// [`AppError::Reauthorize`].
    ///
    /// # Errors
    ///
    /// Returns the converted error, or `AppError::Reauthorize`.
    pub async fn guard<T, E>(&self, result: Result<T, E>) -> Result<T, AppError>
    where
        E: Into<AppError>,
    {
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.reject(e).await),
        }
    }

    /// Convert an error, deleting the session first if it means the
    /// shop's token was rejected.
    pub async fn reject(&self, error: impl Into<AppError>) -> AppError {
        let error = error.into();
        if error.requires_reauth() {
            self.reauthorize(&error).await
        } else {
            error
        }
    }

    async fn reauthorize(&self, cause: &AppError) -> AppError {
        tracing::warn!(shop = %self.shop, error = %cause, "Shopify rejected the access token, deleting session");
        if let Err(e) = self.state.sessions().delete(&self.shop).await {
            tracing::error!(shop = %self.shop, error = %e, "Failed to delete rejected session");
        }
        AppError::Reauthorize {
            shop: self.shop.clone(),
        }
    }

    /// Render an error the way the caller expects: JSON for fetches, a
    /// redirect or error body for page loads.
    #[must_use]
    pub fn error_response(&self, error: AppError) -> Response {
        if self.wants_json {
            error.into_response()
        } else {
            PageError(error).into_response()
        }
    }

    /// Per-shop metafield locks.
    #[must_use]
    pub fn locks(&self) -> &ShopLocks {
        self.state.locks()
    }

    /// Query string that keeps App Bridge context on in-app links.
    #[must_use]
    pub fn embedded_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("shop", self.shop.as_str());
        if let Some(host) = &self.host {
            query.append_pair("host", host);
        }
        query.finish()
    }
}

/// Why a request could not be tied to a shop.
#[derive(Debug)]
pub enum ShopRejection {
    /// JSON error for API requests.
    Api(AppError),
    /// Browser redirect for page requests.
    Redirect(String),
    /// Page error, rendered as a redirect where one applies.
    Page(PageError),
}

impl IntoResponse for ShopRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Api(error) => error.into_response(),
            Self::Redirect(to) => Redirect::to(&to).into_response(),
            Self::Page(error) => error.into_response(),
        }
    }
}

/// Session token from the `Authorization` header or `id_token` parameter.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    query_param(parts, "id_token")
}

fn query_param(parts: &Parts, name: &str) -> Option<String> {
    url::form_urlencoded::parse(parts.uri.query()?.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// API calls and JSON fetches get status codes; page loads get redirects.
fn wants_json(parts: &Parts) -> bool {
    parts.uri.path().starts_with("/api/")
        || parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"))
}

/// Page that lets App Bridge fetch a session token and reload `parts`' URL.
fn bounce_url(parts: &Parts, shop: &ShopDomain) -> String {
    let reload = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("shop", shop.as_str());
    if let Some(host) = query_param(parts, "host") {
        query.append_pair("host", &host);
    }
    query.append_pair("shopify-reload", &reload);
    format!("/auth/session-token?{}", query.finish())
}

impl FromRequestParts<AppState> for ShopContext {
    type Rejection = ShopRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let json = wants_json(parts);
        let shopify = &state.config().shopify;

        let verified = session_token(parts)
            .ok_or(SessionTokenError::Missing)
            .and_then(|token| {
                verify_session_token(&token, &shopify.api_key, &shopify.api_secret)
            });

        let shop = match verified {
            Ok((shop, _claims)) => shop,
            Err(e) if json => return Err(ShopRejection::Api(e.into())),
            Err(e) => {
                tracing::debug!(error = %e, "Page load without a valid session token");
                return Err(ShopRejection::Redirect(
                    shop_from_query(parts.uri.query()).map_or_else(
                        || "/auth/login".to_string(),
                        |shop| bounce_url(parts, &shop),
                    ),
                ));
            }
        };

        let session = match state.sessions().load(&shop).await {
            Ok(Some(session)) => session,
            Ok(None) if json => return Err(ShopRejection::Api(AppError::Reauthorize { shop })),
            Ok(None) => {
                return Err(ShopRejection::Page(PageError(AppError::Reauthorize { shop })));
            }
            Err(e) => return Err(ShopRejection::Api(e.into())),
        };

        sentry::configure_scope(|scope| scope.set_tag("shop", shop.as_str()));

        let admin = state.shopify().shop(&shop, &session.access_token);
        Ok(Self {
            host: query_param(parts, "host"),
            wants_json: json,
            shop,
            session,
            admin,
            state: state.clone(),
        })
    }
}
