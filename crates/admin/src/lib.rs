//! ProudShop admin library.
//!
//! The back-office API: a settings store with encrypted values, SMTP mail
//! dispatch, `OpenAI` content helpers, storefront live chat and admin
//! authentication. The [`client`] module is the other side of the settings
//! and chat APIs, used by the CLI and other services.
//!
//! # Security
//!
//! Settings hold third-party credentials (SMTP, Stripe, Facebook, `OpenAI`).
//! Secret values are encrypted at rest and never logged.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod settings;
pub mod state;

use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application: routes, state and middleware stack.
///
/// Trailing slashes are trimmed before routing, so `/api/v1/settings/` and
/// `/api/v1/settings` reach the same handler.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let cors = middleware::cors_layer(&state.config().cors_origins);

    let router = routes::routes()
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
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
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
