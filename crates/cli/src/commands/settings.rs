//! Settings store commands, run against the API.
//!
//! Values are encrypted locally before they leave the machine, with the
//! same key the server uses (`ENCRYPTION_KEY`).
//!
//! # Usage
//!
//! ```bash
//! ps-cli settings set smtp_host smtp.example.com --plaintext
//! ps-cli settings set smtp_password 'hunter22'
//! ps-cli settings get smtp_password
//! ps-cli settings category smtp
//! ps-cli settings list
//! ps-cli settings delete smtp_password
//! ```
//!
//! # Environment Variables
//!
//! - `PROUDSHOP_API_URL` - API base URL (default `http://localhost:8000/api/v1`)
//! - `PROUDSHOP_API_TOKEN` - Admin bearer token (see `ps-cli admin login`)
//! - `ENCRYPTION_KEY` - Settings encryption passphrase

use thiserror::Error;

use proudshop_admin::client::{ClientError, SettingWrite, SettingsClient};
use proudshop_admin::crypto::{CryptoError, SettingsCipher};
use proudshop_admin::settings::ProcessEnv;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("API error: {0}")]
    Api(#[from] ClientError),

    #[error("Encryption setup failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Setting {0} is not set")]
    NotSet(String),
}

fn client() -> Result<SettingsClient, SettingsError> {
    let api = super::api_client()?;
    let cipher = SettingsCipher::from_env(&ProcessEnv)?;
    Ok(SettingsClient::new(api, cipher))
}

/// Print one decrypted value.
pub async fn get(key: &str) -> Result<(), SettingsError> {
    let value = client()?
        .try_get(key)
        .await?
        .ok_or_else(|| SettingsError::NotSet(key.to_owned()))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{value}");
    }
    Ok(())
}

pub async fn set(
    key: &str,
    value: &str,
    category: Option<String>,
    description: Option<String>,
    plaintext: bool,
) -> Result<(), SettingsError> {
    let mut write = SettingWrite::new(key, value);
    if let Some(category) = category {
        write = write.category(category);
    }
    if let Some(description) = description {
        write = write.description(description);
    }
    if plaintext {
        write = write.plaintext();
    }

    let saved = client()?.try_set(&write).await?;
    tracing::info!(
        "Saved {} (category: {}, encrypted: {})",
        saved.key,
        saved.category,
        saved.is_encrypted
    );
    Ok(())
}

/// List every setting. Encrypted values are not shown.
pub async fn list() -> Result<(), SettingsError> {
    let settings = client()?.try_get_all().await?;

    #[allow(clippy::print_stdout)]
    for setting in &settings {
        let value = if setting.is_encrypted {
            "[ENCRYPTED]"
        } else {
            setting.value.as_str()
        };
        println!("{:<32} {:<10} {}", setting.key, setting.category, value);
    }
    tracing::info!("{} settings", settings.len());
    Ok(())
}

/// Print the decrypted settings of one category as `key=value`.
pub async fn category(category: &str) -> Result<(), SettingsError> {
    let values = client()?.try_get_by_category(category).await?;

    #[allow(clippy::print_stdout)]
    for (key, value) in &values {
        println!("{key}={value}");
    }
    Ok(())
}

pub async fn delete(key: &str) -> Result<(), SettingsError> {
    client()?.try_delete(key).await?;
    tracing::info!("Deleted {}", key);
    Ok(())
}
