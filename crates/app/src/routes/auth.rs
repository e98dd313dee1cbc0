//! OAuth install and login route handlers.
//!
//! The offline access token is obtained with Shopify's authorization code
//! grant:
//!
//! 1. `/auth/login?shop=..` stores a random `state` in the cookie session and
//!    sends the browser to the shop's authorize page.
//! 2. Shopify redirects to `/auth/callback` with `code`, `state` and an
//!    `hmac` over the query.
//! 3. The code is exchanged for the offline token, which is stored as the
//!    shop's session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use shopi_section_core::ShopDomain;
use tower_sessions::Session;
use tracing::instrument;

use crate::models::ShopSession;
use crate::models::session::keys;
use crate::services::{generate_oauth_state, verify_callback_hmac};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/callback", get(callback))
        .route("/auth/session-token", get(session_token_bounce))
}

// =============================================================================
// Templates
// =============================================================================

/// Shop domain form.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub shop: String,
    pub error_message: Option<String>,
}

/// Breaks out of the admin iframe before going to Shopify's authorize page.
#[derive(Template, WebTemplate)]
#[template(path = "auth/exit_iframe.html")]
pub struct ExitIframeTemplate {
    pub api_key: String,
    pub redirect_url: String,
}

/// Lets App Bridge fetch a session token and reload the original URL.
#[derive(Template, WebTemplate)]
#[template(path = "auth/session_token.html")]
pub struct SessionTokenTemplate {
    pub api_key: String,
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub shop: Option<String>,
    /// Set by the admin when the app is loaded in its iframe.
    pub embedded: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub shop: Option<String>,
}

/// Map a login `error` code to a message.
fn error_message(code: &str) -> String {
    match code {
        "oauth_denied" => "Authorization was denied.".to_string(),
        "oauth_invalid_hmac" => "Invalid security signature. Please try again.".to_string(),
        "oauth_invalid_state" => "Your login expired. Please try again.".to_string(),
        "oauth_failed" => "Login failed. Please try again.".to_string(),
        "oauth_exchange_failed" => "Shopify did not accept the authorization.".to_string(),
        "oauth_save_failed" => "Failed to save the installation.".to_string(),
        _ => format!("Error: {code}"),
    }
}

fn login_error(code: &str) -> Redirect {
    Redirect::to(&format!("/auth/login?error={code}"))
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /auth/login - Shop domain form, or start OAuth when `shop` is given.
#[instrument(skip(state, session))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<LoginParams>,
) -> Response {
    let Some(raw_shop) = params.shop.filter(|s| !s.trim().is_empty()) else {
        return LoginTemplate {
            shop: String::new(),
            error_message: params.error.as_deref().map(error_message),
        }
        .into_response();
    };

    start_oauth(&state, &session, &raw_shop, params.embedded.as_deref() == Some("1")).await
}

/// POST /auth/login - Shop domain form submit.
#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let raw_shop = form.shop.unwrap_or_default();
    if raw_shop.trim().is_empty() {
        return LoginTemplate {
            shop: String::new(),
            error_message: Some("Please enter your shop domain.".to_string()),
        }
        .into_response();
    }

    start_oauth(&state, &session, &raw_shop, false).await
}

async fn start_oauth(
    state: &AppState,
    session: &Session,
    raw_shop: &str,
    embedded: bool,
) -> Response {
    let shop = match ShopDomain::parse(raw_shop) {
        Ok(shop) => shop,
        Err(e) => {
            return LoginTemplate {
                shop: raw_shop.to_string(),
                error_message: Some(e.to_string()),
            }
            .into_response();
        }
    };

    // Generate a random state parameter for CSRF protection
    let oauth_state = generate_oauth_state();
    if let Err(e) = session.insert(keys::OAUTH_STATE, &oauth_state).await {
        tracing::error!("Failed to store OAuth state: {}", e);
        return login_error("oauth_failed").into_response();
    }
    if let Err(e) = session.insert(keys::OAUTH_SHOP, shop.as_str()).await {
        tracing::error!("Failed to store OAuth shop: {}", e);
        return login_error("oauth_failed").into_response();
    }

    let config = state.config();
    let auth_url = state.shopify().authorization_url(
        &shop,
        &config.oauth_redirect_uri(),
        &config.shopify.scopes,
        &oauth_state,
    );

    tracing::info!(shop = %shop, scopes = ?config.shopify.scopes, "Starting OAuth");
    if embedded {
        return ExitIframeTemplate {
            api_key: config.shopify.api_key.clone(),
            redirect_url: auth_url,
        }
        .into_response();
    }
    Redirect::to(&auth_url).into_response()
}

/// GET /auth/callback - Handle the OAuth callback.
#[instrument(skip(state, session, params))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let param = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    // Check for errors from Shopify
    if let Some(error) = param("error") {
        let description = param("error_description").unwrap_or_default();
        tracing::error!("Shopify OAuth error: {} - {}", error, description);
        return login_error("oauth_denied").into_response();
    }

    // Verify HMAC signature from Shopify
    if !verify_callback_hmac(&params, &state.config().shopify.api_secret) {
        tracing::error!("Invalid HMAC signature in OAuth callback");
        return login_error("oauth_invalid_hmac").into_response();
    }

    let (Some(code), Some(callback_state), Some(raw_shop)) =
        (param("code"), param("state"), param("shop"))
    else {
        tracing::error!("Missing code, state or shop in callback");
        return login_error("oauth_failed").into_response();
    };

    let Ok(shop) = ShopDomain::parse(raw_shop) else {
        tracing::error!(shop = raw_shop, "Invalid shop in callback");
        return login_error("oauth_failed").into_response();
    };

    // Verify state and shop match what we stored
    let stored_state: Option<String> = session.get(keys::OAUTH_STATE).await.ok().flatten();
    let stored_shop: Option<String> = session.get(keys::OAUTH_SHOP).await.ok().flatten();
    if stored_state.as_deref() != Some(callback_state)
        || stored_shop.as_deref() != Some(shop.as_str())
    {
        tracing::error!("OAuth state mismatch - possible CSRF attack");
        return login_error("oauth_invalid_state").into_response();
    }

    // Clear the state from session
    let _ = session.remove::<String>(keys::OAUTH_STATE).await;
    let _ = session.remove::<String>(keys::OAUTH_SHOP).await;

    // Exchange code for token
    let token = match state.shopify().exchange_code(&shop, code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to exchange OAuth code: {}", e);
            return login_error("oauth_exchange_failed").into_response();
        }
    };

    let shop_session = ShopSession::new(token.shop, token.access_token, &token.scope);
    if let Err(e) = state.sessions().store(&shop_session).await {
        tracing::error!("Failed to save shop session: {}", e);
        return login_error("oauth_save_failed").into_response();
    }

    tracing::info!(shop = %shop_session.shop, scope = %shop_session.scope(), "Shop installed");

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("shop", shop_session.shop.as_str());
    if let Some(host) = param("host") {
        query.append_pair("host", host);
    }
    Redirect::to(&format!("/app?{}", query.finish())).into_response()
}

/// GET /auth/session-token - App Bridge session token bounce page.
///
/// App Bridge reads `shopify-reload` from the URL, fetches a fresh token and
/// reloads that URL with `id_token` appended.
pub async fn session_token_bounce(State(state): State<AppState>) -> SessionTokenTemplate {
    SessionTokenTemplate {
        api_key: state.config().shopify.api_key.clone(),
    }
}
