//! Admin user repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use proudshop_core::{AdminUserId, Email};

use super::{RepositoryError, conflict_or_database};
use crate::models::admin_user::{AdminRole, AdminUser};

/// Internal row type for `PostgreSQL` admin queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: i32,
    email: String,
    name: String,
    role: AdminRole,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: AdminUserId::new(row.id),
            email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: AdminUserRow,
    password_hash: String,
}

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            "SELECT id, email, name, role, created_at FROM admins WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an admin and their password hash by email, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, email, name, role, created_at, password_hash
            FROM admins
            WHERE lower(email) = lower($1)
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create an admin with an already-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        role: AdminRole,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(
            r"
            INSERT INTO admins (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, role, created_at
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(role)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "email"))?;

        row.try_into()
    }

    /// Replace an admin's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no admin has this email.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE admins SET password_hash = $1 WHERE lower(email) = lower($2)")
                .bind(password_hash)
                .bind(email.as_str())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
