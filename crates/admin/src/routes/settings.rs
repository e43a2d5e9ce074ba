//! Settings store API.
//!
//! Values travel exactly as stored. Encryption happens in the client (or in
//! [`DbSettings`](crate::settings::DbSettings) on the server side), so a
//! row flagged `is_encrypted` holds ciphertext here.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use tracing::instrument;

use crate::db::SettingsRepository;
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, RequireSettingsManager};
use crate::models::{Setting, UpsertSetting};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/settings",
            get(list_settings).post(upsert_setting).put(upsert_setting),
        )
        .route("/settings/category/{category}", get(list_by_category))
        .route("/settings/{key}", delete(delete_setting))
}

async fn list_settings(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<Setting>>, AppError> {
    let settings = SettingsRepository::new(state.pool()).list().await?;
    Ok(Json(settings))
}

async fn list_by_category(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(category): Path<String>,
) -> Result<Json<Vec<Setting>>, AppError> {
    let settings = SettingsRepository::new(state.pool())
        .list_by_category(&category)
        .await?;
    Ok(Json(settings))
}

/// Create or replace a setting by key.
#[instrument(skip(state, admin, body), fields(key = %body.key, admin_id = %admin.id))]
async fn upsert_setting(
    State(state): State<AppState>,
    RequireSettingsManager(admin): RequireSettingsManager,
    Json(body): Json<UpsertSetting>,
) -> Result<Json<Setting>, AppError> {
    body.validate().map_err(AppError::BadRequest)?;

    let setting = SettingsRepository::new(state.pool()).upsert(&body).await?;
    tracing::info!(category = %setting.category, encrypted = setting.is_encrypted, "Setting saved");
    Ok(Json(setting))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_setting(
    State(state): State<AppState>,
    RequireSettingsManager(admin): RequireSettingsManager,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    SettingsRepository::new(state.pool())
        .delete(&key)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound(format!("Setting {key} not found"))
            }
            other => other.into(),
        })?;

    tracing::info!("Setting deleted");
    Ok(StatusCode::NO_CONTENT)
}
