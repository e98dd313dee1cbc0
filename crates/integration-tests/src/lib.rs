//! Integration tests for Shopi Section.
//!
//! The tests drive the real router in-process. Shopify is an `httpmock`
//! server reached through `endpoint_override`, shop sessions live in
//! [`MemorySessionStorage`] and cookie sessions in a tower-sessions
//! `MemoryStore`, so no database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopi-section-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `sections` - Section activation and deactivation through `/api/section`
//! - `carousel` - Carousel editor JSON and saves
//! - `auth_flow` - OAuth install, session tokens, reauthorization

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, StatusCode, header};
use httpmock::MockServer;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use shopi_section_app::config::{AppConfig, ShopifyAppConfig};
use shopi_section_app::db::{MemorySessionStorage, SessionStorage};
use shopi_section_app::middleware::session_layer;
use shopi_section_app::models::ShopSession;
use shopi_section_app::services::SessionClaims;
use shopi_section_app::state::AppState;
use shopi_section_core::ShopDomain;

/// App client ID used by every test.
pub const API_KEY: &str = "integration-client-id";
/// App client secret; signs session tokens and OAuth HMACs.
pub const API_SECRET: &str = "integration-client-secret";
/// Shop every test installs.
pub const SHOP: &str = "demo.myshopify.com";
/// Offline token stored for [`SHOP`].
pub const ACCESS_TOKEN: &str = "shpat_integration";
/// Theme the section tests target.
pub const THEME_ID: u64 = 5;
/// Primary Admin API version.
pub const API_VERSION: &str = "2025-01";

/// Path of an Admin REST or GraphQL resource on the mock.
#[must_use]
pub fn admin_path(resource: &str) -> String {
    format!("/admin/api/{API_VERSION}/{resource}")
}

/// The app wired to a mock Shopify.
pub struct TestApp {
    pub router: Router,
    pub shopify: MockServer,
    pub sessions: Arc<MemorySessionStorage>,
}

impl TestApp {
    /// App with [`SHOP`] already installed.
    pub async fn installed() -> Self {
        let app = Self::uninstalled().await;
        app.sessions
            .store(&ShopSession::new(
                shop(),
                SecretString::from(ACCESS_TOKEN),
                "read_themes,write_themes,write_products",
            ))
            .await
            .unwrap();
        app
    }

    /// App with no stored shop sessions.
    pub async fn uninstalled() -> Self {
        let shopify = MockServer::start_async().await;
        let config = config(&shopify);
        let sessions = Arc::new(MemorySessionStorage::new());

        let state = AppState::new(config.clone(), sessions.clone());
        let router = shopi_section_app::app(state, session_layer(MemoryStore::default(), &config));

        Self {
            router,
            shopify,
            sessions,
        }
    }

    /// A fresh App Bridge session token for [`SHOP`].
    #[must_use]
    pub fn session_token(&self) -> String {
        session_token_for(SHOP, API_SECRET)
    }

    /// Whether [`SHOP`] still has a stored session.
    pub async fn is_installed(&self) -> bool {
        self.sessions.load(&shop()).await.unwrap().is_some()
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Authenticated JSON GET.
    pub async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::get(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.session_token()))
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();
        let response = self.send(request).await;
        (response.status(), body_json(response).await)
    }

    /// Authenticated form POST expecting JSON back.
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> (StatusCode, HeaderMap, Value) {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::post(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.session_token()))
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        (status, headers, body_json(response).await)
    }
}

/// Config pointing the Admin API at the mock server.
#[must_use]
pub fn config(shopify: &MockServer) -> AppConfig {
    let mut shopify_config = ShopifyAppConfig::new(API_KEY, SecretString::from(API_SECRET));
    shopify_config.endpoint_override = Some(Url::parse(&shopify.base_url()).unwrap());

    AppConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k3J9x!pQ2mZ8vW4tR7yB1nC6hF0sD5gL"),
        shopify: shopify_config,
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// The installed shop's domain.
#[must_use]
pub fn shop() -> ShopDomain {
    ShopDomain::parse(SHOP).unwrap()
}

/// Sign a session token for `shop` the way App Bridge does.
#[must_use]
pub fn session_token_for(shop: &str, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = SessionClaims {
        iss: format!("https://{shop}/admin"),
        dest: format!("https://{shop}"),
        aud: API_KEY.to_string(),
        sub: Some("1".to_string()),
        exp: now + 60,
        nbf: now - 1,
        iat: Some(now - 1),
        jti: Some(format!("jti-{now}")),
        sid: None,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Read a response body as JSON (`Null` for an empty body).
pub async fn body_json(response: Response<Body>) -> Value {
    let text = body_text(response).await;
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap()
}

/// Read a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Mocks for the shop-owned metafield reads and writes.
pub mod metafields {
    use httpmock::Method::POST;
    use httpmock::{Mock, MockServer};
    use serde_json::json;

    use super::admin_path;

    /// Answer reads of `key` with `value` (or no metafield).
    pub async fn stored<'a>(server: &'a MockServer, key: &str, value: Option<&str>) -> Mock<'a> {
        let metafield = value.map_or(serde_json::Value::Null, |v| {
            json!({"id": "gid://shopify/Metafield/1", "value": v, "compareDigest": "digest-1"})
        });
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(admin_path("graphql.json"))
                    .body_contains("GetShopMetafield")
                    .body_contains(key);
                then.status(200).json_body(json!({
                    "data": {"shop": {"id": "gid://shopify/Shop/1", "metafield": metafield}}
                }));
            })
            .await
    }

    /// Accept writes of `key`.
    pub async fn writable<'a>(server: &'a MockServer, key: &str) -> Mock<'a> {
        let key = key.to_string();
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(admin_path("graphql.json"))
                    .body_contains("MetafieldsSet")
                    .body_contains(&key);
                then.status(200).json_body(json!({
                    "data": {"metafieldsSet": {
                        "metafields": [{
                            "namespace": "shopi_section",
                            "key": key,
                            "value": "[]",
                            "compareDigest": "digest-2"
                        }],
                        "userErrors": []
                    }}
                }));
            })
            .await
    }

    /// Reject every write of `key` as made against a stale digest.
    pub async fn stale<'a>(server: &'a MockServer, key: &str) -> Mock<'a> {
        let key = key.to_string();
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(admin_path("graphql.json"))
                    .body_contains("MetafieldsSet")
                    .body_contains(&key);
                then.status(200).json_body(json!({
                    "data": {"metafieldsSet": {
                        "metafields": [],
                        "userErrors": [{
                            "field": ["metafields", "0", "compareDigest"],
                            "code": "STALE_OBJECT",
                            "message": "The resource has been updated since it was loaded."
                        }]
                    }}
                }));
            })
            .await
    }
}

/// Compute the `hmac` Shopify appends to OAuth redirects.
#[must_use]
pub fn sign_callback(params: &[(&str, &str)], secret: &str) -> String {
    use hmac::{Hmac, Mac};

    let mut pairs: Vec<(&str, &str)> = params.to_vec();
    pairs.sort_unstable();
    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
