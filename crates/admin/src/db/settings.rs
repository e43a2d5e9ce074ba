//! Settings table operations.
//!
//! Values are stored as given. Encryption happens before a value reaches
//! this layer (client side, or in [`crate::settings::DbSettings`]).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use proudshop_core::SettingId;

use super::RepositoryError;
use crate::models::{Setting, UpsertSetting};

/// Internal row type for `PostgreSQL` setting queries.
#[derive(Debug, sqlx::FromRow)]
struct SettingRow {
    id: i32,
    key: String,
    value: String,
    category: String,
    description: Option<String>,
    is_encrypted: bool,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for Setting {
    fn from(row: SettingRow) -> Self {
        Self {
            id: SettingId::new(row.id),
            key: row.key,
            value: row.value,
            category: row.category,
            description: row.description,
            is_encrypted: row.is_encrypted,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, key, value, category, description, is_encrypted, updated_at";

/// Repository for settings.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All settings ordered by category, then key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Setting>, RepositoryError> {
        let rows = sqlx::query_as::<_, SettingRow>(&format!(
            "SELECT {COLUMNS} FROM admin_settings ORDER BY category, key"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Settings in one category, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Setting>, RepositoryError> {
        let rows = sqlx::query_as::<_, SettingRow>(&format!(
            "SELECT {COLUMNS} FROM admin_settings WHERE category = $1 ORDER BY key"
        ))
        .bind(category.to_lowercase())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A single setting by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<Setting>, RepositoryError> {
        let row = sqlx::query_as::<_, SettingRow>(&format!(
            "SELECT {COLUMNS} FROM admin_settings WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert or replace a setting by key.
    ///
    /// `value` is written verbatim; callers that want it encrypted pass
    /// ciphertext and `is_encrypted = true`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, setting: &UpsertSetting) -> Result<Setting, RepositoryError> {
        let row = sqlx::query_as::<_, SettingRow>(&format!(
            r"
            INSERT INTO admin_settings (key, value, category, description, is_encrypted)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                category = EXCLUDED.category,
                description = COALESCE(EXCLUDED.description, admin_settings.description),
                is_encrypted = EXCLUDED.is_encrypted,
                updated_at = NOW()
            RETURNING {COLUMNS}
            "
        ))
        .bind(setting.key.trim())
        .bind(&setting.value)
        .bind(setting.resolved_category())
        .bind(setting.description.as_deref())
        .bind(setting.is_encrypted)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete a setting by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no setting has this key.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM admin_settings WHERE key = $1")
            .bind(key)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
