//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ps-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! Migrations live in `crates/admin/migrations/` and are embedded in the
//! admin crate. The server never runs them on start.

use thiserror::Error;

use super::DatabaseError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the admin database migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running admin migrations...");
    proudshop_admin::db::run_migrations(&pool).await?;

    tracing::info!("Admin migrations complete!");
    Ok(())
}
