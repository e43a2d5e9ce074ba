//! Dedicated endpoint for the `OpenAI` key, so the settings screen can show
//! whether one is stored without ever sending it back.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use proudshop_core::setting_keys;

use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, RequireSettingsManager};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/openai/key", get(key_status).post(set_key))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyStatus {
    pub exists: bool,
    pub masked: bool,
    /// Last four characters of the stored key.
    pub last4: Option<String>,
}

#[derive(Deserialize)]
pub struct SetKeyRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Saved {
    pub ok: bool,
}

fn last4(value: &str) -> Option<String> {
    let chars: Vec<char> = value.chars().collect();
    let start = chars.len().checked_sub(4)?;
    chars.get(start..).map(|tail| tail.iter().collect())
}

async fn key_status(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<KeyStatus>, AppError> {
    let value = state
        .settings()
        .try_get(setting_keys::OPENAI_API_KEY)
        .await?
        .filter(|v| !v.is_empty());

    Ok(Json(KeyStatus {
        exists: value.is_some(),
        masked: value.is_some(),
        last4: value.as_deref().and_then(last4),
    }))
}

/// Store the key encrypted. The key name must be exactly `OPENAI_API_KEY`.
#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn set_key(
    State(state): State<AppState>,
    RequireSettingsManager(admin): RequireSettingsManager,
    Json(body): Json<SetKeyRequest>,
) -> Result<Json<Saved>, AppError> {
    if body.key != setting_keys::OPENAI_API_KEY {
        return Err(AppError::BadRequest(
            "Key name must be OPENAI_API_KEY".to_string(),
        ));
    }
    if body.value.trim().is_empty() {
        return Err(AppError::BadRequest("Key value cannot be empty".to_string()));
    }

    state
        .settings()
        .set(
            setting_keys::OPENAI_API_KEY,
            body.value.trim(),
            Some("openai"),
            Some("OpenAI API key"),
            true,
        )
        .await?;

    tracing::info!("OpenAI key updated");
    Ok(Json(Saved { ok: true }))
}
