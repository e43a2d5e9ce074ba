//! Admin authentication service.
//!
//! Email + password login issuing HS256 bearer tokens. Passwords are stored
//! as argon2id PHC strings.

mod error;
mod password;
mod token;

pub use error::AdminAuthError;
pub use password::{MIN_PASSWORD_LEN, hash_password, verify_password};
pub use token::{Claims, TokenService};

use sqlx::PgPool;

use proudshop_core::{AdminRole, AdminUserId, Email};

use crate::db::RepositoryError;
use crate::db::admin_users::AdminUserRepository;
use crate::models::AdminUser;

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: AdminUserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
            tokens,
        }
    }

    /// Check credentials and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` for an unknown email or
    /// wrong password, `AdminAuthError::InvalidEmail` for a malformed email,
    /// or `AdminAuthError::Repository` if the lookup fails.
    #[tracing::instrument(skip_all, fields(email = tracing::field::Empty))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AdminUser, String), AdminAuthError> {
        let email = Email::parse(email)?;
        tracing::Span::current().record("email", email.masked().as_str());

        let Some((user, hash)) = self.users.get_with_password_hash(&email).await? else {
            tracing::info!("Login attempt for unknown admin");
            return Err(AdminAuthError::InvalidCredentials);
        };

        if !verify_password(password, &hash) {
            tracing::info!(admin_id = %user.id, "Login attempt with wrong password");
            return Err(AdminAuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        tracing::info!(admin_id = %user.id, "Admin logged in");
        Ok((user, token))
    }

    /// Resolve a bearer token to the admin it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidToken` if the token does not verify,
    /// or `AdminAuthError::UserNotFound` if the admin no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<AdminUser, AdminAuthError> {
        let id = self.tokens.verify(token)?;
        self.get_user(id).await
    }

    /// Get an admin user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, admin_user_id: AdminUserId) -> Result<AdminUser, AdminAuthError> {
        self.users
            .get_by_id(admin_user_id)
            .await?
            .ok_or(AdminAuthError::UserNotFound)
    }
}

/// Account management that needs no token signing (used by the CLI).
pub struct AdminAccounts<'a> {
    users: AdminUserRepository<'a>,
}

impl<'a> AdminAccounts<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
        }
    }

    /// Create an admin account.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::UserAlreadyExists` for a taken email,
    /// `AdminAuthError::WeakPassword` for a short password, or a repository
    /// error.
    pub async fn create_admin(
        &self,
        email: &str,
        name: &str,
        role: AdminRole,
        password: &str,
    ) -> Result<AdminUser, AdminAuthError> {
        let email = Email::parse(email)?;
        let hash = hash_password(password)?;

        match self.users.create(&email, name, role, &hash).await {
            Ok(user) => {
                tracing::info!(admin_id = %user.id, role = ?role, "Created admin");
                Ok(user)
            }
            Err(RepositoryError::Conflict(_)) => Err(AdminAuthError::UserAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace an admin's password.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::UserNotFound` for an unknown email,
    /// `AdminAuthError::WeakPassword` for a short password, or a repository
    /// error.
    pub async fn set_password(&self, email: &str, password: &str) -> Result<(), AdminAuthError> {
        let email = Email::parse(email)?;
        let hash = hash_password(password)?;

        match self.users.set_password_hash(&email, &hash).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(AdminAuthError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }
}
