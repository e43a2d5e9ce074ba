//! Setting records and the write payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use proudshop_core::{SettingCategory, SettingId, infer_category};

/// A stored setting.
///
/// `value` is returned exactly as stored: when `is_encrypted` is set it is
/// ciphertext, and only holders of the encryption passphrase can read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub id: SettingId,
    pub key: String,
    pub value: String,
    pub category: String,
    pub description: Option<String>,
    pub is_encrypted: bool,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST`/`PUT /settings/`.
///
/// Both verbs upsert by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertSetting {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_encrypted: bool,
}

impl UpsertSetting {
    /// The category to store: the explicit one, or one inferred from the key.
    #[must_use]
    pub fn resolved_category(&self) -> String {
        match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category.to_lowercase(),
            _ => infer_category(&self.key).as_str().to_string(),
        }
    }

    /// Reject empty or oversized keys.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message suitable for a 400 response.
    pub fn validate(&self) -> Result<(), String> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err("key is required".to_string());
        }
        if key.len() > 255 {
            return Err("key must be at most 255 characters".to_string());
        }
        if key.chars().any(char::is_whitespace) {
            return Err("key must not contain whitespace".to_string());
        }
        Ok(())
    }
}

impl Setting {
    /// The category as one of the known groups, `System` for anything else.
    #[must_use]
    pub fn known_category(&self) -> SettingCategory {
        match self.category.as_str() {
            "smtp" => SettingCategory::Smtp,
            "stripe" => SettingCategory::Stripe,
            "facebook" => SettingCategory::Facebook,
            "openai" => SettingCategory::OpenAi,
            _ => SettingCategory::System,
        }
    }
}
