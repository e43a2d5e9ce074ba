//! Database operations for the back-office `PostgreSQL`.
//!
//! ## Tables
//!
//! - `admins` - Back-office operators (argon2 password hashes)
//! - `admin_settings` - Flat key/value settings, optionally encrypted
//! - `chat_sessions` - Storefront live-chat sessions
//! - `chat_messages` - Messages belonging to a chat session
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! ps-cli migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` rows), so
//! the workspace builds without a database or offline query data.

pub mod admin_users;
pub mod chat;
pub mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use chat::ChatRepository;
pub use settings::SettingsRepository;

/// Migrations embedded at compile time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
