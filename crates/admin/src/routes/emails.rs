//! Mail diagnostics, ad-hoc sends and canned templates.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use proudshop_core::Email;

use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::services::email::{
    AuthMatrix, EmailError, EmailOptions, MailCheck, RenderedEmail, TemplateFields, TemplateKind,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/emails/check", get(check))
        .route("/emails/auth-matrix", get(auth_matrix))
        .route("/emails/send", post(send))
        .route("/emails/templates/{kind}", post(send_template))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: Vec<Email>,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub ok: bool,
    pub sent: usize,
    pub message_id: String,
}

/// Render a canned template; send it too when `to` is present.
#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    #[serde(default)]
    pub to: Option<Email>,
    #[serde(flatten)]
    pub fields: TemplateFields,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    #[serde(flatten)]
    pub email: RenderedEmail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

async fn check(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Json<MailCheck> {
    Json(state.mailer().check().await)
}

#[instrument(skip_all)]
async fn auth_matrix(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<AuthMatrix>, AppError> {
    match state.mailer().auth_matrix().await {
        Ok(matrix) => Ok(Json(matrix)),
        Err(EmailError::NotConfigured(_)) => Err(AppError::BadRequest(
            "Missing smtp_host|smtp_user|smtp_password".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_configured(state: &AppState) -> Result<(), AppError> {
    let check = state.mailer().check().await;
    if check.ok {
        return Ok(());
    }
    if let Some(error) = check.error {
        return Err(AppError::BadRequest(error));
    }
    tracing::warn!(missing = ?check.missing, "SMTP settings incomplete");
    Err(AppError::BadRequest(
        "SMTP settings are not configured".to_string(),
    ))
}

#[instrument(skip_all, fields(admin_id = %admin.id, recipients = body.to.len()))]
async fn send(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendResponse>, AppError> {
    if body.to.is_empty() {
        return Err(AppError::BadRequest("At least one recipient is required".to_string()));
    }
    if body.subject.trim().is_empty() {
        return Err(AppError::BadRequest("Subject is required".to_string()));
    }
    ensure_configured(&state).await?;

    let sent = body.to.len();
    let options = EmailOptions {
        to: body.to,
        subject: body.subject,
        html: body.html,
        attachments: Vec::new(),
        from_email: body.from_email,
        from_name: body.from_name,
    };
    let message_id = state.mailer().send_email(&options).await?;

    Ok(Json(SendResponse {
        ok: true,
        sent,
        message_id,
    }))
}

#[instrument(skip_all, fields(admin_id = %admin.id, kind = %kind))]
async fn send_template(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(kind): Path<String>,
    Json(body): Json<TemplateRequest>,
) -> Result<Json<TemplateResponse>, AppError> {
    let kind: TemplateKind = kind.parse().map_err(AppError::NotFound)?;
    let email = state.templates().render(kind, &body.fields)?;

    let message_id = match body.to {
        Some(to) => {
            ensure_configured(&state).await?;
            let options = EmailOptions::new(to, email.subject.clone(), email.html.clone());
            Some(state.mailer().send_email(&options).await?)
        }
        None => None,
    };

    Ok(Json(TemplateResponse { email, message_id }))
}
