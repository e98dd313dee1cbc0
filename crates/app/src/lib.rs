//! Shopi Section app library.
//!
//! An embedded Shopify admin app that installs prebuilt Liquid sections
//! into a shop's themes and edits the slides of the 3D carousel section.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for the embedded pages
//! - Shopify Admin API (REST for themes and assets, GraphQL for theme files
//!   and metafields)
//! - `PostgreSQL` for offline shop sessions and cookie sessions
//!
//! The router is built here so integration tests can drive it with a mocked
//! Shopify and in-memory storage.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod sections;
pub mod services;
pub mod shopify;
pub mod state;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::security_headers_middleware;
use crate::state::AppState;

/// Build the application router.
///
/// Sentry layers are added by the binary so tests run without them.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes::routes()
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
