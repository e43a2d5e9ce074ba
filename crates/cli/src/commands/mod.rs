//! Command implementations.

pub mod admin;
pub mod chat;
pub mod crypto;
pub mod email;
pub mod migrate;
pub mod settings;

use secrecy::SecretString;
use thiserror::Error;

use proudshop_admin::client::ApiClient;

/// Errors shared by the database-backed commands.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the admin database named by `ADMIN_DATABASE_URL` (or
/// `DATABASE_URL`).
pub async fn connect() -> Result<sqlx::PgPool, DatabaseError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| DatabaseError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    let pool = proudshop_admin::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}

/// API client from `PROUDSHOP_API_URL` / `PROUDSHOP_API_TOKEN`.
pub fn api_client() -> Result<ApiClient, proudshop_admin::client::ClientError> {
    dotenvy::dotenv().ok();
    ApiClient::from_env()
}
