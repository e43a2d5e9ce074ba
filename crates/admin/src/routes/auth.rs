//! Admin login and identity.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::models::AdminUser;
use crate::services::auth::AdminAuthService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Exchange email and password for a bearer token.
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let (_, access_token) = AdminAuthService::new(state.pool(), state.tokens())
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// The admin the bearer token belongs to.
async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<AdminUser> {
    Json(admin)
}
