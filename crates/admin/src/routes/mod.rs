//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! Everything is mounted under `/api/v1`.
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database)
//!
//! POST   /auth/login                      - Exchange credentials for a token
//! GET    /auth/me                         - Current admin
//!
//! GET    /settings                        - All settings (raw values)
//! POST   /settings                        - Upsert a setting (PUT also accepted)
//! DELETE /settings/{key}                  - Delete a setting
//! GET    /settings/category/{category}    - Settings in one category
//!
//! GET    /openai/key                      - Whether an OpenAI key is stored
//! POST   /openai/key                      - Store the OpenAI key (encrypted)
//!
//! GET    /emails/check                    - SMTP diagnostics
//! GET    /emails/auth-matrix              - Try common SMTP connection modes
//! POST   /emails/send                     - Send an HTML email
//! POST   /emails/templates/{kind}         - Render (and optionally send) a template
//!
//! POST   /ai/image                        - Product image
//! POST   /ai/description                  - Product description
//! POST   /ai/marketing                    - Marketing copy
//! POST   /ai/sales-analysis               - Sales insights
//! POST   /ai/email                        - Compose an offer or newsletter
//! POST   /products/ai/suggest             - Title, description and tags
//!
//! POST   /chat/sessions                   - Open a session (public)
//! GET    /chat/sessions                   - Recent sessions (admin)
//! GET    /chat/sessions/{id}              - Session with messages (public)
//! DELETE /chat/sessions/{id}              - Delete a session (admin)
//! POST   /chat/sessions/{id}/messages     - Post a message
//! ```

pub mod ai;
pub mod auth;
pub mod chat;
pub mod emails;
pub mod health;
pub mod openai_key;
pub mod settings;

use axum::Router;

use crate::state::AppState;

/// API version prefix.
pub const API_PREFIX: &str = "/api/v1";

/// Build the API router (without state or layers).
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(settings::router())
        .merge(openai_key::router())
        .merge(emails::router())
        .merge(ai::router())
        .merge(chat::router());

    Router::new().nest(API_PREFIX, api)
}
