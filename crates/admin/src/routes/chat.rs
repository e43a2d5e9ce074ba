//! Storefront live chat.
//!
//! Creating a session, reading one and posting as the customer are public
//! (the widget has no account). Listing, deleting and posting as admin or
//! system need an admin token.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use proudshop_core::{ChatRole, Email};

use crate::db::{ChatRepository, RepositoryError};
use crate::error::AppError;
use crate::middleware::{OptionalAdminAuth, RequireAdminAuth};
use crate::models::{ChatMessage, ChatSessionWithMessages};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/sessions", get(list_sessions).post(create_session))
        .route(
            "/chat/sessions/{session_id}",
            get(get_session).delete(delete_session),
        )
        .route("/chat/sessions/{session_id}/messages", post(post_message))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
    #[serde(default)]
    pub role: ChatRole,
}

fn session_not_found(e: RepositoryError, message: &str) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound(message.to_string()),
        other => other.into(),
    }
}

#[instrument(skip_all)]
async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<ChatSessionWithMessages>), AppError> {
    let Json(body) = body.unwrap_or_default();

    let email = body
        .customer_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(Email::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let name = body
        .customer_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let session = ChatRepository::new(state.pool())
        .create_session(email.as_ref(), name)
        .await?;
    tracing::info!(session_id = %session.session_id, "Chat session opened");

    Ok((
        StatusCode::CREATED,
        Json(ChatSessionWithMessages {
            session,
            messages: Vec::new(),
        }),
    ))
}

async fn list_sessions(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<ChatSessionWithMessages>>, AppError> {
    let sessions = ChatRepository::new(state.pool()).list_sessions().await?;
    Ok(Json(sessions))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSessionWithMessages>, AppError> {
    ChatRepository::new(state.pool())
        .get_session_with_messages(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))
}

#[instrument(skip(state, admin, body), fields(role = %body.role))]
async fn post_message(
    State(state): State<AppState>,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Path(session_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    if body.role != ChatRole::User && admin.is_none() {
        return Err(AppError::Unauthorized("Not authenticated".to_string()));
    }
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "Message content cannot be empty".to_string(),
        ));
    }

    let message = ChatRepository::new(state.pool())
        .add_message(&session_id, body.role, content)
        .await
        .map_err(|e| session_not_found(e, "Session not found"))?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_session(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    ChatRepository::new(state.pool())
        .delete_session(&session_id)
        .await
        .map_err(|e| session_not_found(e, "Session not found"))?;

    tracing::info!("Chat session deleted");
    Ok(StatusCode::NO_CONTENT)
}
