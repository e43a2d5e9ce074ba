//! Remote settings accessor.
//!
//! Every call goes to the API; nothing is cached. The plain methods
//! (`get`, `set`, ...) log failures and degrade to an empty answer so
//! callers that only want "the value if there is one" stay simple. The
//! `try_*` variants return the error for callers that must tell "not
//! configured" apart from "could not ask".

use std::collections::BTreeMap;

use tracing::instrument;

use super::{ApiClient, ClientError};
use crate::crypto::SettingsCipher;
use crate::models::{Setting, UpsertSetting};
use crate::settings::{
    EmailSettings, FacebookConfig, OpenAiSettings, SettingsSource, StripeConfig,
};

/// A setting write.
///
/// `is_encrypted: None` means "encrypt": values are only stored in the
/// clear when the caller explicitly opts out.
#[derive(Debug, Clone)]
pub struct SettingWrite {
    pub key: String,
    pub value: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_encrypted: Option<bool>,
}

impl SettingWrite {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            category: None,
            description: None,
            is_encrypted: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Store the value in the clear.
    #[must_use]
    pub const fn plaintext(mut self) -> Self {
        self.is_encrypted = Some(false);
        self
    }

    const fn encrypts(&self) -> bool {
        !matches!(self.is_encrypted, Some(false))
    }
}

/// Client for `/settings`, encrypting on write and decrypting on read.
#[derive(Debug, Clone)]
pub struct SettingsClient {
    api: ApiClient,
    cipher: SettingsCipher,
}

impl SettingsClient {
    #[must_use]
    pub const fn new(api: ApiClient, cipher: SettingsCipher) -> Self {
        Self { api, cipher }
    }

    fn plaintext(&self, setting: &Setting) -> String {
        if setting.is_encrypted {
            self.cipher.decrypt(&setting.value)
        } else {
            setting.value.clone()
        }
    }

    // =========================================================================
    // Fallible API
    // =========================================================================

    /// All settings as stored (encrypted values stay encrypted).
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn try_get_all(&self) -> Result<Vec<Setting>, ClientError> {
        self.api.get_json(&["settings"]).await
    }

    /// The decrypted value of `key`, or `None` if it does not exist.
    ///
    /// Fetches the whole list and searches it.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn try_get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let settings = self.try_get_all().await?;
        Ok(settings
            .iter()
            .find(|s| s.key == key)
            .map(|s| self.plaintext(s)))
    }

    /// Upsert a setting, encrypting the value unless told not to.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    #[instrument(skip(self, write), fields(key = %write.key, encrypted = write.encrypts()))]
    pub async fn try_set(&self, write: &SettingWrite) -> Result<Setting, ClientError> {
        let encrypt = write.encrypts();
        let value = if encrypt {
            self.cipher.simple_encrypt(&write.value)
        } else {
            write.value.clone()
        };

        let body = UpsertSetting {
            key: write.key.clone(),
            value,
            category: write.category.clone(),
            description: write.description.clone(),
            is_encrypted: encrypt,
        };
        self.api.post_json(&["settings"], &body).await
    }

    /// Decrypted key/value pairs of the settings in `category`.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn try_get_by_category(
        &self,
        category: &str,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let settings: Vec<Setting> = self
            .api
            .get_json(&["settings", "category", category])
            .await?;

        Ok(settings
            .iter()
            .map(|s| (s.key.clone(), self.plaintext(s)))
            .collect())
    }

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the key does not exist, or another
    /// `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn try_delete(&self, key: &str) -> Result<(), ClientError> {
        self.api.delete(&["settings", key]).await
    }

    // =========================================================================
    // Degrading API
    // =========================================================================

    /// The decrypted value of `key`; `None` if absent or unreachable.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).await.unwrap_or_else(|e| {
            tracing::error!(key, error = %e, "Error getting setting");
            None
        })
    }

    /// Upsert a setting; `false` on any failure.
    pub async fn set(&self, write: &SettingWrite) -> bool {
        match self.try_set(write).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(key = %write.key, error = %e, "Error setting setting");
                false
            }
        }
    }

    /// Settings in `category`; empty on failure.
    pub async fn get_by_category(&self, category: &str) -> BTreeMap<String, String> {
        self.try_get_by_category(category)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(category, error = %e, "Error getting settings by category");
                BTreeMap::new()
            })
    }

    /// All settings; empty on failure.
    pub async fn get_all(&self) -> Vec<Setting> {
        self.try_get_all().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Error getting all settings");
            Vec::new()
        })
    }

    /// Delete `key`; `false` on any failure, including "no such key".
    pub async fn delete(&self, key: &str) -> bool {
        match self.try_delete(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key, error = %e, "Error deleting setting");
                false
            }
        }
    }

    // =========================================================================
    // Integration helpers
    // =========================================================================

    pub async fn facebook_config(&self) -> FacebookConfig {
        FacebookConfig::load(self).await
    }

    pub async fn stripe_config(&self) -> StripeConfig {
        StripeConfig::load(self).await
    }

    pub async fn email_config(&self) -> EmailSettings {
        EmailSettings::load(self).await
    }

    pub async fn openai_config(&self) -> OpenAiSettings {
        OpenAiSettings::load(self).await
    }
}

impl SettingsSource for SettingsClient {
    async fn get(&self, key: &str) -> Option<String> {
        Self::get(self, key).await
    }
}
