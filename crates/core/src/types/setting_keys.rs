//! Well-known setting keys and their grouping.
//!
//! Settings are a flat key/value namespace. Integrations look up their
//! credentials by these keys; the category is only a label used to group
//! them in the back-office.

pub const SMTP_HOST: &str = "smtp_host";
pub const SMTP_PORT: &str = "smtp_port";
pub const SMTP_SECURE: &str = "smtp_secure";
pub const SMTP_USER: &str = "smtp_user";
pub const SMTP_PASSWORD: &str = "smtp_password";
pub const SMTP_FROM_EMAIL: &str = "smtp_from_email";
pub const SMTP_FROM_NAME: &str = "smtp_from_name";

pub const STRIPE_SECRET_KEY: &str = "stripe_secret_key";
pub const STRIPE_PUBLISHABLE_KEY: &str = "stripe_publishable_key";
pub const STRIPE_WEBHOOK_SECRET: &str = "stripe_webhook_secret";

pub const FACEBOOK_ACCESS_TOKEN: &str = "facebook_access_token";
pub const FACEBOOK_AD_ACCOUNT_ID: &str = "facebook_ad_account_id";
pub const FACEBOOK_PAGE_ID: &str = "facebook_page_id";
pub const FACEBOOK_APP_ID: &str = "facebook_app_id";
pub const FACEBOOK_APP_SECRET: &str = "facebook_app_secret";

/// Canonical `OpenAI` key name. The lowercase alias is still honored on read.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_API_KEY_ALIAS: &str = "openai_api_key";

/// Grouping label for a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingCategory {
    Smtp,
    Stripe,
    Facebook,
    OpenAi,
    System,
}

impl SettingCategory {
    /// The label stored in the `category` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smtp => "smtp",
            Self::Stripe => "stripe",
            Self::Facebook => "facebook",
            Self::OpenAi => "openai",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer the category of a setting from its key.
///
/// Used when a write does not name a category explicitly.
///
/// ```
/// use proudshop_core::{SettingCategory, infer_category};
///
/// assert_eq!(infer_category("smtp_host"), SettingCategory::Smtp);
/// assert_eq!(infer_category("OPENAI_API_KEY"), SettingCategory::OpenAi);
/// assert_eq!(infer_category("site_name"), SettingCategory::System);
/// ```
#[must_use]
pub fn infer_category(key: &str) -> SettingCategory {
    let lower = key.to_lowercase();
    if lower.starts_with("smtp_") || lower.starts_with("email_") {
        SettingCategory::Smtp
    } else if lower.starts_with("stripe_") {
        SettingCategory::Stripe
    } else if lower.starts_with("facebook_") {
        SettingCategory::Facebook
    } else if lower.starts_with("openai_") {
        SettingCategory::OpenAi
    } else {
        SettingCategory::System
    }
}
