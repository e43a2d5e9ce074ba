//! HTTP middleware for the admin API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. Trailing-slash normalization (wraps the router, so `/settings/` and
//!    `/settings` route the same)
//! 3. `TraceLayer` (request tracing)
//! 4. CORS for the configured admin frontends
//! 5. Security headers
//!
//! Authentication is per-route via the extractors in [`auth`].

pub mod auth;

use axum::{
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use auth::{OptionalAdminAuth, RequireAdminAuth, RequireSettingsManager};

/// Add conservative security headers to every response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );

    response
}

/// CORS for the admin frontends. Origins that are not valid header values
/// are skipped with a warning.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(origin, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        // Must not panic on a value with a newline
        let _layer = cors_layer(&[
            "http://localhost:3000".to_string(),
            "http://bad\norigin".to_string(),
        ]);
    }
}
