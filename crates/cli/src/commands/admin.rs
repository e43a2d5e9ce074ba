//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin user
//! ps-cli admin create -e admin@example.com -n "Admin Name" -r super_admin -p 'long password'
//!
//! # Reset a password
//! ps-cli admin set-password -e admin@example.com -p 'new long password'
//!
//! # Log in against a running API and print the bearer token
//! ps-cli admin login -e admin@example.com -p 'long password'
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin database
//! - `PROUDSHOP_API_URL` - API base URL for `login`

use serde_json::json;
use thiserror::Error;

use proudshop_admin::client::ClientError;
use proudshop_admin::routes::auth::TokenResponse;
use proudshop_admin::services::{AdminAccounts, AdminAuthError};
use proudshop_core::{AdminRole, AdminUserId};

use super::DatabaseError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] DatabaseError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, staff")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AdminAuthError),

    #[error("API error: {0}")]
    Api(#[from] ClientError),
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<AdminUserId, AdminError> {
    // Parse and validate role
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let pool = super::connect().await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let user = AdminAccounts::new(&pool)
        .create_admin(email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Replace an admin's password.
pub async fn set_password(email: &str, password: &str) -> Result<(), AdminError> {
    let pool = super::connect().await?;

    AdminAccounts::new(&pool).set_password(email, password).await?;
    tracing::info!("Password updated for {}", email);
    Ok(())
}

/// Log in against the API and print the access token.
pub async fn login(email: &str, password: &str) -> Result<(), AdminError> {
    let api = super::api_client()?;
    let token: TokenResponse = api
        .post_json(
            &["auth", "login"],
            &json!({ "email": email, "password": password }),
        )
        .await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", token.access_token);
    }
    tracing::info!("Export it as PROUDSHOP_API_TOKEN to use the admin commands");
    Ok(())
}
