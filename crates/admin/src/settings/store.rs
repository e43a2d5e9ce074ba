//! Server-side settings access straight from the database.

use std::collections::BTreeMap;

use sqlx::PgPool;

use super::SettingsSource;
use crate::crypto::SettingsCipher;
use crate::db::{RepositoryError, SettingsRepository};
use crate::models::{Setting, UpsertSetting};

/// Settings read from the `admin_settings` table, decrypted on the way out.
///
/// This is the in-process counterpart of
/// [`SettingsClient`](crate::client::SettingsClient): both implement
/// [`SettingsSource`], so mail and AI helpers run unchanged on either side
/// of the API.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pool: PgPool,
    cipher: SettingsCipher,
}

impl DbSettings {
    #[must_use]
    pub const fn new(pool: PgPool, cipher: SettingsCipher) -> Self {
        Self { pool, cipher }
    }

    #[must_use]
    pub const fn cipher(&self) -> &SettingsCipher {
        &self.cipher
    }

    /// Read and decrypt a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn try_get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let setting = SettingsRepository::new(&self.pool).get(key).await?;
        Ok(setting.map(|s| self.plaintext(&s)))
    }

    /// Write a setting, encrypting the value first when `encrypt` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        category: Option<&str>,
        description: Option<&str>,
        encrypt: bool,
    ) -> Result<Setting, RepositoryError> {
        let value = if encrypt {
            self.cipher.simple_encrypt(value)
        } else {
            value.to_owned()
        };

        SettingsRepository::new(&self.pool)
            .upsert(&UpsertSetting {
                key: key.to_owned(),
                value,
                category: category.map(str::to_owned),
                description: description.map(str::to_owned),
                is_encrypted: encrypt,
            })
            .await
    }

    /// Decrypted key/value pairs of one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_category(
        &self,
        category: &str,
    ) -> Result<BTreeMap<String, String>, RepositoryError> {
        let settings = SettingsRepository::new(&self.pool)
            .list_by_category(category)
            .await?;

        Ok(settings
            .into_iter()
            .map(|s| {
                let value = self.plaintext(&s);
                (s.key, value)
            })
            .collect())
    }

    /// The stored value, decrypted if the row is flagged encrypted.
    #[must_use]
    pub fn plaintext(&self, setting: &Setting) -> String {
        if setting.is_encrypted {
            self.cipher.decrypt(&setting.value)
        } else {
            setting.value.clone()
        }
    }
}

impl SettingsSource for DbSettings {
    async fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to read setting");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use proudshop_core::SettingId;

    use super::*;

    fn store() -> DbSettings {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        DbSettings::new(pool, SettingsCipher::from_passphrase("store-tests").unwrap())
    }

    fn setting(value: String, is_encrypted: bool) -> Setting {
        Setting {
            id: SettingId::new(1),
            key: "smtp_password".to_string(),
            value,
            category: "smtp".to_string(),
            description: None,
            is_encrypted,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_plaintext_decrypts_flagged_rows() {
        let store = store();
        let ciphertext = store.cipher().simple_encrypt("hunter2");
        assert_eq!(store.plaintext(&setting(ciphertext, true)), "hunter2");
    }

    #[tokio::test]
    async fn test_plaintext_leaves_unflagged_rows_alone() {
        let store = store();
        // Looks like ciphertext but is not flagged: returned verbatim
        let raw = store.cipher().simple_encrypt("x");
        assert_eq!(store.plaintext(&setting(raw.clone(), false)), raw);
    }
}
