//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (session storage)
//!
//! # Auth
//! GET  /auth/login             - Shop form, or start OAuth with ?shop=
//! POST /auth/login             - Shop form submit
//! GET  /auth/callback          - OAuth callback
//! GET  /auth/session-token     - App Bridge session token bounce
//!
//! # Embedded pages (session token)
//! GET  /                       - Redirect to /app
//! GET  /app                    - Dashboard
//! GET  /app/carousel           - Carousel editor (JSON with Accept: application/json)
//! POST /app/carousel           - Save carousel data
//!
//! # API (session token)
//! POST /api/section            - Activate or deactivate a section
//! GET  /api/themes             - Themes with installed sections
//! POST /api/test-upload        - Theme access diagnostics
//! ```

pub mod api;
pub mod auth;
pub mod carousel;
pub mod dashboard;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Create all routes for the app.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(carousel::router())
        .merge(api::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if session storage is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.sessions().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
