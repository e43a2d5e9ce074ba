//! Credential bundles for the third-party integrations.
//!
//! Each bundle is read key by key from a [`SettingsSource`]. Absent keys stay
//! `None`; callers decide which fields they actually need. Only the mail
//! and `OpenAI` helpers consult the environment as well, and they do so in
//! their own modules.

use secrecy::SecretString;

use proudshop_core::setting_keys;

use super::{SettingsSource, non_empty};

async fn read(settings: &impl SettingsSource, key: &str) -> Option<String> {
    non_empty(settings.get(key).await)
}

async fn read_secret(settings: &impl SettingsSource, key: &str) -> Option<SecretString> {
    read(settings, key).await.map(SecretString::from)
}

fn redact(value: Option<&SecretString>) -> &'static str {
    if value.is_some() { "[SET]" } else { "[NOT SET]" }
}

/// Facebook Marketing API credentials.
#[derive(Clone, Default)]
pub struct FacebookConfig {
    pub access_token: Option<SecretString>,
    pub ad_account_id: Option<String>,
    pub page_id: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<SecretString>,
}

impl std::fmt::Debug for FacebookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookConfig")
            .field("access_token", &redact(self.access_token.as_ref()))
            .field("ad_account_id", &self.ad_account_id)
            .field("page_id", &self.page_id)
            .field("app_id", &self.app_id)
            .field("app_secret", &redact(self.app_secret.as_ref()))
            .finish()
    }
}

impl FacebookConfig {
    pub async fn load(settings: &impl SettingsSource) -> Self {
        Self {
            access_token: read_secret(settings, setting_keys::FACEBOOK_ACCESS_TOKEN).await,
            ad_account_id: read(settings, setting_keys::FACEBOOK_AD_ACCOUNT_ID).await,
            page_id: read(settings, setting_keys::FACEBOOK_PAGE_ID).await,
            app_id: read(settings, setting_keys::FACEBOOK_APP_ID).await,
            app_secret: read_secret(settings, setting_keys::FACEBOOK_APP_SECRET).await,
        }
    }

    /// Enough to call the Ads API: a token and an ad account.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.access_token.is_some() && self.ad_account_id.is_some()
    }
}

/// Stripe credentials.
#[derive(Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<SecretString>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &redact(self.secret_key.as_ref()))
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &redact(self.webhook_secret.as_ref()))
            .finish()
    }
}

impl StripeConfig {
    pub async fn load(settings: &impl SettingsSource) -> Self {
        Self {
            secret_key: read_secret(settings, setting_keys::STRIPE_SECRET_KEY).await,
            publishable_key: read(settings, setting_keys::STRIPE_PUBLISHABLE_KEY).await,
            webhook_secret: read_secret(settings, setting_keys::STRIPE_WEBHOOK_SECRET).await,
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.secret_key.is_some() && self.publishable_key.is_some()
    }
}

/// SMTP values as stored in settings, before any environment fallback.
///
/// See [`crate::services::email::TransportConfig`] for the resolved form.
#[derive(Clone, Default)]
pub struct EmailSettings {
    pub host: Option<String>,
    pub port: Option<String>,
    pub secure: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("password", &redact(self.password.as_ref()))
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl EmailSettings {
    pub async fn load(settings: &impl SettingsSource) -> Self {
        Self {
            host: read(settings, setting_keys::SMTP_HOST).await,
            port: read(settings, setting_keys::SMTP_PORT).await,
            secure: read(settings, setting_keys::SMTP_SECURE).await,
            user: read(settings, setting_keys::SMTP_USER).await,
            password: read_secret(settings, setting_keys::SMTP_PASSWORD).await,
            from_email: read(settings, setting_keys::SMTP_FROM_EMAIL).await,
            from_name: read(settings, setting_keys::SMTP_FROM_NAME).await,
        }
    }
}

/// `OpenAI` credentials from settings.
///
/// The canonical `OPENAI_API_KEY` wins over the legacy `openai_api_key`.
#[derive(Clone, Default)]
pub struct OpenAiSettings {
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &redact(self.api_key.as_ref()))
            .finish()
    }
}

impl OpenAiSettings {
    pub async fn load(settings: &impl SettingsSource) -> Self {
        let api_key = match read_secret(settings, setting_keys::OPENAI_API_KEY).await {
            Some(key) => Some(key),
            None => read_secret(settings, setting_keys::OPENAI_API_KEY_ALIAS).await,
        };
        Self { api_key }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::settings::StaticValues;

    #[tokio::test]
    async fn test_openai_canonical_key_wins() {
        let settings = StaticValues::from_pairs([
            ("OPENAI_API_KEY", "sk-canonical"),
            ("openai_api_key", "sk-legacy"),
        ]);
        let config = OpenAiSettings::load(&settings).await;
        assert_eq!(config.api_key.unwrap().expose_secret(), "sk-canonical");
    }

    #[tokio::test]
    async fn test_openai_legacy_alias() {
        let settings = StaticValues::from_pairs([("openai_api_key", "sk-legacy")]);
        let config = OpenAiSettings::load(&settings).await;
        assert_eq!(config.api_key.unwrap().expose_secret(), "sk-legacy");

        let config = OpenAiSettings::load(&StaticValues::new()).await;
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn test_facebook_config() {
        let settings = StaticValues::from_pairs([
            ("facebook_access_token", "EAAG-token"),
            ("facebook_ad_account_id", "act_123"),
            ("facebook_page_id", ""),
        ]);
        let config = FacebookConfig::load(&settings).await;
        assert!(config.is_configured());
        assert!(config.page_id.is_none());

        let debug = format!("{config:?}");
        assert!(!debug.contains("EAAG-token"));
        assert!(debug.contains("act_123"));
    }

    #[tokio::test]
    async fn test_stripe_config_incomplete() {
        let settings = StaticValues::from_pairs([("stripe_secret_key", "sk_test_1")]);
        let config = StripeConfig::load(&settings).await;
        assert!(!config.is_configured());
        assert!(format!("{config:?}").contains("[NOT SET]"));
    }

    #[tokio::test]
    async fn test_email_settings_only_reads_settings() {
        let settings = StaticValues::from_pairs([("smtp_host", "mail.proudshop.al")]);
        let config = EmailSettings::load(&settings).await;
        assert_eq!(config.host.as_deref(), Some("mail.proudshop.al"));
        assert!(config.port.is_none());
        assert!(config.password.is_none());
    }
}
