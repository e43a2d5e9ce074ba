//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] proudshop_core::EmailError),

    /// Wrong email or password. Deliberately does not say which.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Admin user not found.
    #[error("User not found")]
    UserNotFound,

    /// Admin user already exists.
    #[error("admin user already exists")]
    UserAlreadyExists,

    /// Password too short to accept.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Token missing, malformed, expired or signed with another key.
    #[error("Invalid token")]
    InvalidToken,

    /// Hashing or token signing failed.
    #[error("credential processing failed: {0}")]
    Internal(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
