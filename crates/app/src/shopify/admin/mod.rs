//! Shopify Admin API client (REST + GraphQL) with OAuth helpers.
//!
//! [`AdminClient`] is shared across requests and holds the app credentials.
//! [`ShopAdmin`] binds it to one shop and one access token for the duration
//! of a request.

use std::sync::Arc;

use graphql_client::GraphQLQuery;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use shopi_section_core::{AssetKey, ShopDomain, ThemeId};
use tracing::instrument;
use url::Url;

use crate::config::ShopifyAppConfig;

use super::{
    AdminShopifyError, GraphQLError, GraphQLErrorLocation,
    types::{Asset, Metafield, MetafieldWrite, ShopMetafield, Theme},
};

pub mod queries;

use queries::{GetAppAccessScopes, GetShopMetafield, MetafieldsSet, ThemeFilesUpsert};

/// Header carrying the offline access token on every Admin API call.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// `userErrors` code Shopify returns when `compareDigest` no longer matches.
const STALE_OBJECT_CODE: &str = "STALE_OBJECT";

/// Error bodies are truncated to this many characters before being kept.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Default wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Result of a successful OAuth code exchange.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    /// Offline access token for API calls
    pub access_token: SecretString,
    /// Granted scopes (comma-separated)
    pub scope: String,
    /// Shop the token belongs to
    pub shop: ShopDomain,
}

/// Shopify Admin API client.
///
/// Cheap to clone. Holds the app credentials and a pooled HTTP client; shop
/// tokens are passed per call through [`AdminClient::shop`].
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    api_version: String,
    fallback_api_version: String,
    endpoint_override: Option<Url>,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("api_key", &self.inner.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.inner.api_version)
            .field("fallback_api_version", &self.inner.fallback_api_version)
            .finish_non_exhaustive()
    }
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

/// OAuth token response from Shopify.
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct ThemesEnvelope {
    themes: Vec<Theme>,
}

#[derive(Debug, Deserialize)]
struct ThemeEnvelope {
    theme: Theme,
}

#[derive(Debug, Deserialize)]
struct AssetEnvelope {
    asset: Asset,
}

#[derive(Debug, Serialize)]
struct AssetWriteEnvelope<'a> {
    asset: AssetWrite<'a>,
}

#[derive(Debug, Serialize)]
struct AssetWrite<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessScopesEnvelope {
    access_scopes: Vec<AccessScopeHandle>,
}

#[derive(Debug, Deserialize)]
struct AccessScopeHandle {
    handle: String,
}

impl AdminClient {
    /// Create a new Admin API client.
    #[must_use]
    pub fn new(config: &ShopifyAppConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shopi-section/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(AdminClientInner {
                client,
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                api_version: config.api_version.clone(),
                fallback_api_version: config.fallback_api_version.clone(),
                endpoint_override: config.endpoint_override.clone(),
            }),
        }
    }

    /// The app's client ID.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    /// The app's client secret (HMAC and session-token verification).
    #[must_use]
    pub fn api_secret(&self) -> &SecretString {
        &self.inner.api_secret
    }

    /// Primary Admin API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.inner.api_version
    }

    /// Admin API version retried when an asset upload fails on the primary one.
    #[must_use]
    pub fn fallback_api_version(&self) -> &str {
        &self.inner.fallback_api_version
    }

    /// Base URL for a shop: the configured override, or `https://{shop}`.
    #[must_use]
    pub fn base_url(&self, shop: &ShopDomain) -> String {
        self.inner.endpoint_override.as_ref().map_or_else(
            || format!("https://{shop}"),
            |url| url.as_str().trim_end_matches('/').to_string(),
        )
    }

    /// Bind the client to a shop and its access token.
    #[must_use]
    pub fn shop(&self, shop: &ShopDomain, access_token: &SecretString) -> ShopAdmin {
        ShopAdmin {
            client: self.clone(),
            shop: shop.clone(),
            access_token: access_token.clone(),
        }
    }

    // =========================================================================
    // OAuth Flow
    // =========================================================================

    /// Generate the OAuth authorization URL for a shop.
    #[must_use]
    pub fn authorization_url(
        &self,
        shop: &ShopDomain,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> String {
        let scope = scopes.join(",");
        format!(
            "{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            self.base_url(shop),
            urlencoding::encode(&self.inner.api_key),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::OAuth` if Shopify rejects the exchange.
    /// Returns `AdminShopifyError::Http` if the HTTP request fails.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<OAuthToken, AdminShopifyError> {
        let url = format!("{}/admin/oauth/access_token", self.base_url(shop));

        let params = [
            ("client_id", self.inner.api_key.as_str()),
            ("client_secret", self.inner.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::OAuth(format!(
                "Token exchange failed: {}",
                truncate(&text)
            )));
        }

        let token_response: OAuthTokenResponse = response.json().await?;

        Ok(OAuthToken {
            access_token: SecretString::from(token_response.access_token),
            scope: token_response.scope,
            shop: shop.clone(),
        })
    }
}

/// Admin API access for one shop.
///
/// Every method sends the shop's access token. A 401 or 403 surfaces as
/// [`AdminShopifyError::Unauthorized`] / [`AdminShopifyError::Forbidden`]
/// so callers can drop the session and ask the merchant to reinstall.
#[derive(Clone)]
pub struct ShopAdmin {
    client: AdminClient,
    shop: ShopDomain,
    access_token: SecretString,
}

impl std::fmt::Debug for ShopAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopAdmin")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl ShopAdmin {
    /// The shop this handle talks to.
    #[must_use]
    pub const fn shop_domain(&self) -> &ShopDomain {
        &self.shop
    }

    /// The shared client.
    #[must_use]
    pub const fn client(&self) -> &AdminClient {
        &self.client
    }

    fn rest_url(&self, version: &str, path: &str) -> String {
        format!(
            "{}/admin/api/{version}/{path}",
            self.client.base_url(&self.shop)
        )
    }

    fn asset_url(
        &self,
        version: &str,
        theme_id: ThemeId,
        key: Option<&AssetKey>,
    ) -> Result<Url, AdminShopifyError> {
        let mut url = Url::parse(&self.rest_url(
            version,
            &format!("themes/{theme_id}/assets.json"),
        ))?;
        if let Some(key) = key {
            url.query_pairs_mut().append_pair("asset[key]", key.as_str());
        }
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: impl reqwest::IntoUrl,
    ) -> reqwest::RequestBuilder {
        self.client
            .inner
            .client
            .request(method, url)
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
    }

    // =========================================================================
    // Themes
    // =========================================================================

    /// List all themes of the shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the token.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn list_themes(&self) -> Result<Vec<Theme>, AdminShopifyError> {
        let url = self.rest_url(self.client.api_version(), "themes.json");
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let response = check_status(response, "themes.json").await?;
        let envelope: ThemesEnvelope = response.json().await?;
        Ok(envelope.themes)
    }

    /// Fetch one theme.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if the theme does not exist.
    #[instrument(skip(self), fields(shop = %self.shop, theme_id = %theme_id))]
    pub async fn get_theme(&self, theme_id: ThemeId) -> Result<Theme, AdminShopifyError> {
        let path = format!("themes/{theme_id}.json");
        let url = self.rest_url(self.client.api_version(), &path);
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let response = check_status(response, &path).await?;
        let envelope: ThemeEnvelope = response.json().await?;
        Ok(envelope.theme)
    }

    // =========================================================================
    // Theme assets
    // =========================================================================

    /// Read one theme asset. A missing asset is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the token.
    #[instrument(skip(self), fields(shop = %self.shop, theme_id = %theme_id, key = %key))]
    pub async fn get_asset(
        &self,
        theme_id: ThemeId,
        key: &AssetKey,
    ) -> Result<Option<Asset>, AdminShopifyError> {
        let url = self.asset_url(self.client.api_version(), theme_id, Some(key))?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        match check_status(response, key.as_str()).await {
            Ok(response) => {
                let envelope: AssetEnvelope = response.json().await?;
                Ok(Some(envelope.asset))
            }
            Err(AdminShopifyError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace a theme asset with the primary API version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the write.
    pub async fn put_asset(
        &self,
        theme_id: ThemeId,
        key: &AssetKey,
        value: &str,
    ) -> Result<Asset, AdminShopifyError> {
        self.put_asset_with_version(self.client.api_version(), theme_id, key, value)
            .await
    }

    /// Create or replace a theme asset with an explicit API version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the write.
    #[instrument(skip(self, value), fields(shop = %self.shop, theme_id = %theme_id, key = %key, bytes = value.len()))]
    pub async fn put_asset_with_version(
        &self,
        version: &str,
        theme_id: ThemeId,
        key: &AssetKey,
        value: &str,
    ) -> Result<Asset, AdminShopifyError> {
        let url = self.asset_url(version, theme_id, None)?;
        let body = AssetWriteEnvelope {
            asset: AssetWrite {
                key: key.as_str(),
                value,
            },
        };

        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, key.as_str()).await?;
        let envelope: AssetEnvelope = response.json().await?;
        Ok(envelope.asset)
    }

    /// Delete a theme asset. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the token.
    #[instrument(skip(self), fields(shop = %self.shop, theme_id = %theme_id, key = %key))]
    pub async fn delete_asset(
        &self,
        theme_id: ThemeId,
        key: &AssetKey,
    ) -> Result<bool, AdminShopifyError> {
        let url = self.asset_url(self.client.api_version(), theme_id, Some(key))?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        match check_status(response, key.as_str()).await {
            Ok(_) => Ok(true),
            Err(AdminShopifyError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Upload a text theme file through GraphQL `themeFilesUpsert`.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the file.
    #[instrument(skip(self, body), fields(shop = %self.shop, theme_id = %theme_id, filename = %filename))]
    pub async fn theme_files_upsert(
        &self,
        theme_id: ThemeId,
        filename: &str,
        body: &str,
    ) -> Result<(), AdminShopifyError> {
        let variables = queries::theme_files_upsert::Variables {
            theme_id: theme_id.to_gid(),
            files: vec![queries::theme_files_upsert::FileInput {
                filename: filename.to_string(),
                body: queries::theme_files_upsert::FileBody {
                    body_type: queries::theme_files_upsert::BodyType::TEXT,
                    value: body.to_string(),
                },
            }],
        };

        let response = self.execute::<ThemeFilesUpsert>(variables).await?;
        let payload = response.theme_files_upsert.ok_or_else(|| {
            AdminShopifyError::UserError("themeFilesUpsert returned no payload".to_string())
        })?;

        if !payload.user_errors.is_empty() {
            let messages: Vec<String> = payload
                .user_errors
                .into_iter()
                .map(|e| match e.filename {
                    Some(file) => format!("{file}: {}", e.message),
                    None => e.message,
                })
                .collect();
            return Err(AdminShopifyError::UserError(messages.join("; ")));
        }

        let upserted = payload
            .upserted_theme_files
            .unwrap_or_default()
            .iter()
            .any(|f| f.filename == filename);
        if !upserted {
            return Err(AdminShopifyError::UserError(format!(
                "{filename} was not reported as upserted"
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Metafields
    // =========================================================================

    /// Read a shop-owned metafield and the shop's GID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn shop_metafield(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<ShopMetafield, AdminShopifyError> {
        let variables = queries::get_shop_metafield::Variables {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };

        let response = self.execute::<GetShopMetafield>(variables).await?;

        Ok(ShopMetafield {
            shop_id: response.shop.id,
            metafield: response.shop.metafield.map(|m| Metafield {
                value: m.value,
                compare_digest: m.compare_digest,
            }),
        })
    }

    /// Write a `json` metafield. Returns the new `compareDigest`.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::StaleMetafield` if the write condition no
    /// longer holds, `AdminShopifyError::UserError` for other rejections.
    #[instrument(skip(self, write), fields(shop = %self.shop, namespace = write.namespace, key = write.key))]
    pub async fn metafields_set(
        &self,
        write: MetafieldWrite<'_>,
    ) -> Result<Option<String>, AdminShopifyError> {
        let qualified = format!("{}.{}", write.namespace, write.key);
        let variables = queries::metafields_set::Variables {
            metafields: vec![queries::metafields_set::MetafieldsSetInput {
                owner_id: write.owner_id.to_string(),
                namespace: write.namespace.to_string(),
                key: write.key.to_string(),
                metafield_type: "json".to_string(),
                value: write.value,
                compare_digest: write.condition.compare_digest(),
            }],
        };

        let response = self.execute::<MetafieldsSet>(variables).await?;
        let payload = response.metafields_set.ok_or_else(|| {
            AdminShopifyError::UserError("metafieldsSet returned no payload".to_string())
        })?;

        if payload
            .user_errors
            .iter()
            .any(|e| e.code.as_deref() == Some(STALE_OBJECT_CODE))
        {
            return Err(AdminShopifyError::StaleMetafield(qualified));
        }

        if !payload.user_errors.is_empty() {
            let messages: Vec<String> = payload
                .user_errors
                .into_iter()
                .map(|e| e.message)
                .collect();
            return Err(AdminShopifyError::UserError(messages.join("; ")));
        }

        Ok(payload
            .metafields
            .unwrap_or_default()
            .into_iter()
            .find(|m| m.namespace == write.namespace && m.key == write.key)
            .and_then(|m| m.compare_digest))
    }

    // =========================================================================
    // Access scopes
    // =========================================================================

    /// Scopes granted to the token (REST).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the token.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn access_scopes(&self) -> Result<Vec<String>, AdminShopifyError> {
        let url = format!(
            "{}/admin/oauth/access_scopes.json",
            self.client.base_url(&self.shop)
        );
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let response = check_status(response, "access_scopes.json").await?;
        let envelope: AccessScopesEnvelope = response.json().await?;
        Ok(envelope
            .access_scopes
            .into_iter()
            .map(|s| s.handle)
            .collect())
    }

    /// Scopes granted to the current app installation (GraphQL).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn app_access_scopes(&self) -> Result<Vec<String>, AdminShopifyError> {
        let response = self
            .execute::<GetAppAccessScopes>(queries::get_app_access_scopes::Variables)
            .await?;
        Ok(response
            .current_app_installation
            .access_scopes
            .into_iter()
            .map(|s| s.handle)
            .collect())
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation against the primary API version.
    ///
    /// # Errors
    ///
    /// Maps HTTP failures like the REST calls; top-level `errors` become
    /// `AdminShopifyError::GraphQL`.
    pub async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        let endpoint = self.rest_url(self.client.api_version(), "graphql.json");
        let body = Q::build_query(variables);

        let response = self
            .request(reqwest::Method::POST, &endpoint)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, body.operation_name).await?;

        let graphql_response: GraphQLResponse<Q::ResponseData> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted_errors: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e
                        .locations
                        .into_iter()
                        .map(|l| GraphQLErrorLocation {
                            line: l.line,
                            column: l.column,
                        })
                        .collect(),
                    path: e.path,
                })
                .collect();
            return Err(AdminShopifyError::GraphQL(converted_errors));
        }

        graphql_response.data.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
            }])
        })
    }
}

/// Map a non-success status onto [`AdminShopifyError`].
async fn check_status(
    response: reqwest::Response,
    resource: &str,
) -> Result<reqwest::Response, AdminShopifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(AdminShopifyError::Unauthorized(format!(
            "access token rejected for {resource}"
        ))),
        StatusCode::FORBIDDEN => Err(AdminShopifyError::Forbidden(format!(
            "access denied for {resource}"
        ))),
        StatusCode::NOT_FOUND => Err(AdminShopifyError::NotFound(resource.to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            // REST sends fractional seconds ("2.0")
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map_or(DEFAULT_RETRY_AFTER_SECS, |s| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let secs = s.ceil() as u64;
                    secs
                });
            Err(AdminShopifyError::RateLimited(retry_after))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(AdminShopifyError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            })
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::WriteCondition;
    use httpmock::Method::{DELETE, GET, POST, PUT};
    use httpmock::MockServer;
    use serde_json::json;

    const TOKEN: &str = "shpat_test_token";

    fn client_for(server: &MockServer) -> AdminClient {
        let mut config = ShopifyAppConfig::new("client-id", SecretString::from("client-secret"));
        config.endpoint_override = Some(Url::parse(&server.base_url()).unwrap());
        AdminClient::new(&config)
    }

    fn shop() -> ShopDomain {
        ShopDomain::parse("test-shop.myshopify.com").unwrap()
    }

    fn admin_for(server: &MockServer) -> ShopAdmin {
        client_for(server).shop(&shop(), &SecretString::from(TOKEN))
    }

    #[test]
    fn test_authorization_url() {
        let config = ShopifyAppConfig::new("client-id", SecretString::from("client-secret"));
        let client = AdminClient::new(&config);
        let url = client.authorization_url(
            &shop(),
            "https://app.example.test/auth/callback",
            &["read_themes".to_string(), "write_themes".to_string()],
            "nonce123",
        );

        assert!(url.starts_with("https://test-shop.myshopify.com/admin/oauth/authorize?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("scope=read_themes%2Cwrite_themes"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.test%2Fauth%2Fcallback"));
        assert!(url.contains("state=nonce123"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ShopifyAppConfig::new("client-id", SecretString::from("client-secret"));
        let client = AdminClient::new(&config);
        let admin = client.shop(&shop(), &SecretString::from(TOKEN));

        assert!(!format!("{client:?}").contains("client-secret"));
        assert!(!format!("{admin:?}").contains(TOKEN));
    }

    #[tokio::test]
    async fn test_list_themes_sends_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/admin/api/2025-01/themes.json")
                    .header(ACCESS_TOKEN_HEADER, TOKEN);
                then.status(200).json_body(json!({
                    "themes": [
                        {"id": 1, "name": "Dawn", "role": "main"},
                        {"id": 2, "name": "Draft", "role": "unpublished"}
                    ]
                }));
            })
            .await;

        let themes = admin_for(&server).list_themes().await.unwrap();

        mock.assert_async().await;
        assert_eq!(themes.len(), 2);
        assert!(themes[0].is_main());
    }

    #[tokio::test]
    async fn test_get_asset_missing_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/admin/api/2025-01/themes/7/assets.json")
                    .query_param("asset[key]", "sections/missing.liquid");
                then.status(404).json_body(json!({"errors": "Not Found"}));
            })
            .await;

        let key = AssetKey::parse("sections/missing.liquid").unwrap();
        let asset = admin_for(&server)
            .get_asset(ThemeId::new(7), &key)
            .await
            .unwrap();
        assert!(asset.is_none());
    }

    #[tokio::test]
    async fn test_put_asset_uses_requested_version() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/admin/api/2024-10/themes/7/assets.json")
                    .body_contains("\"key\":\"sections/a.liquid\"");
                then.status(200).json_body(json!({
                    "asset": {"key": "sections/a.liquid", "theme_id": 7}
                }));
            })
            .await;

        let key = AssetKey::parse("sections/a.liquid").unwrap();
        let asset = admin_for(&server)
            .put_asset_with_version("2024-10", ThemeId::new(7), &key, "<div></div>")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(asset.key, "sections/a.liquid");
    }

    #[tokio::test]
    async fn test_delete_missing_asset_is_false() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/admin/api/2025-01/themes/7/assets.json");
                then.status(404);
            })
            .await;

        let key = AssetKey::parse("sections/a.liquid").unwrap();
        let deleted = admin_for(&server)
            .delete_asset(ThemeId::new(7), &key)
            .await
            .unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/api/2025-01/themes/1.json");
                then.status(401).body("[API] Invalid API key or access token");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/api/2025-01/themes/2.json");
                then.status(429).header("Retry-After", "2.0");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/api/2025-01/themes/3.json");
                then.status(503).body("unavailable");
            })
            .await;

        let admin = admin_for(&server);
        let err = admin.get_theme(ThemeId::new(1)).await.unwrap_err();
        assert!(matches!(err, AdminShopifyError::Unauthorized(_)));
        assert!(err.requires_reauth());

        let err = admin.get_theme(ThemeId::new(2)).await.unwrap_err();
        assert!(matches!(err, AdminShopifyError::RateLimited(2)));

        let err = admin.get_theme(ThemeId::new(3)).await.unwrap_err();
        assert!(matches!(
            err,
            AdminShopifyError::Status { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_metafields_set_stale_digest() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/api/2025-01/graphql.json")
                    .body_contains("MetafieldsSet");
                then.status(200).json_body(json!({
                    "data": {
                        "metafieldsSet": {
                            "metafields": [],
                            "userErrors": [{
                                "field": ["metafields", "0", "compareDigest"],
                                "message": "The resource has been updated since it was loaded.",
                                "code": "STALE_OBJECT"
                            }]
                        }
                    }
                }));
            })
            .await;

        let err = admin_for(&server)
            .metafields_set(MetafieldWrite {
                owner_id: "gid://shopify/Shop/1",
                namespace: "shopi_section",
                key: "installed_sections",
                value: "[]".to_string(),
                condition: WriteCondition::Digest("old".to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AdminShopifyError::StaleMetafield(_)));
    }

    #[tokio::test]
    async fn test_graphql_errors_surface() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/admin/api/2025-01/graphql.json");
                then.status(200).json_body(json!({
                    "errors": [{"message": "Access denied for themeFilesUpsert field."}]
                }));
            })
            .await;

        let err = admin_for(&server)
            .theme_files_upsert(ThemeId::new(7), "sections/a.liquid", "x")
            .await
            .unwrap_err();

        assert!(matches!(err, AdminShopifyError::GraphQL(_)));
        assert!(err.to_string().contains("Access denied"));
    }

    #[tokio::test]
    async fn test_shop_metafield_absent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/admin/api/2025-01/graphql.json")
                    .header(ACCESS_TOKEN_HEADER, TOKEN);
                then.status(200).json_body(json!({
                    "data": {"shop": {"id": "gid://shopify/Shop/1", "metafield": null}}
                }));
            })
            .await;

        let result = admin_for(&server)
            .shop_metafield("shopi_section", "carousel_data")
            .await
            .unwrap();

        assert_eq!(result.shop_id, "gid://shopify/Shop/1");
        assert!(result.metafield.is_none());
    }
}
