//! Unified error handling for the admin API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AdminAuthError;
use crate::services::email::EmailError;
use crate::services::openai::ComposeError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Login or token check failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// SMTP configuration or delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Email composition request was invalid.
    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::Auth(AdminAuthError::UserAlreadyExists) => StatusCode::CONFLICT,
            Self::Database(_)
            | Self::Internal(_)
            | Self::Auth(AdminAuthError::Repository(_) | AdminAuthError::Internal(_))
            | Self::Compose(ComposeError::Template(_))
            | Self::Email(EmailError::Template(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(
                AdminAuthError::InvalidCredentials
                | AdminAuthError::InvalidToken
                | AdminAuthError::UserNotFound,
            )
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Auth(_) | Self::Compose(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Email(EmailError::Smtp(_)) => StatusCode::BAD_GATEWAY,
            Self::Email(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message safe to show the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(what)) => what.clone(),
            Self::Auth(e) if self.status().is_client_error() => e.to_string(),
            Self::Compose(e) if self.status().is_client_error() => e.to_string(),
            Self::Email(e @ EmailError::Smtp(_)) => format!("Failed to send email: {e}"),
            Self::Email(e) if self.status().is_client_error() => e.to_string(),
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::BadRequest(m) => m.clone(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
