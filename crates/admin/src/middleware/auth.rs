//! Bearer-token extractors for admin routes.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::AdminUser;
use crate::services::auth::{AdminAuthError, AdminAuthService};
use crate::state::AppState;

/// Extractor that requires a valid admin bearer token.
///
/// Rejects with 401 and one of `Not authenticated` (no token), `Invalid
/// token` or `User not found`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub AdminUser);

/// The token from `Authorization: Bearer <token>`, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn authenticate(state: &AppState, token: &str) -> Result<AdminUser, AppError> {
    let admin = AdminAuthService::new(state.pool(), state.tokens())
        .authenticate(token)
        .await
        .map_err(|e| match e {
            AdminAuthError::InvalidToken => AppError::Unauthorized("Invalid token".to_string()),
            AdminAuthError::UserNotFound => AppError::Unauthorized("User not found".to_string()),
            other => other.into(),
        })?;

    set_sentry_user(admin.id.as_i32(), Some(admin.email.as_str()));
    Ok(admin)
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
        authenticate(state, token).await.map(Self)
    }
}

/// Extractor that optionally gets the current admin.
///
/// Unlike `RequireAdminAuth`, this does not reject the request. A missing or
/// invalid token both yield `None`.
pub struct OptionalAdminAuth(pub Option<AdminUser>);

impl FromRequestParts<AppState> for OptionalAdminAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let admin = match bearer_token(parts) {
            Some(token) => authenticate(state, token).await.ok(),
            None => None,
        };
        Ok(Self(admin))
    }
}

/// Extractor for routes that change settings: an authenticated admin whose
/// role may manage them. Staff get 403.
pub struct RequireSettingsManager(pub AdminUser);

impl FromRequestParts<AppState> for RequireSettingsManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAdminAuth(admin) = RequireAdminAuth::from_request_parts(parts, state).await?;
        if !admin.role.can_manage_settings() {
            return Err(AppError::Forbidden(
                "Your role cannot change settings".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwdw=="))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
