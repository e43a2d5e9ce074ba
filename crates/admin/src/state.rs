//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::crypto::SettingsCipher;
use crate::services::auth::TokenService;
use crate::services::email::{EmailTemplates, Mailer};
use crate::services::openai::{AiService, EmailBranding};
use crate::settings::DbSettings;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    settings: DbSettings,
    tokens: TokenService,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool, cipher: SettingsCipher) -> Self {
        let tokens = TokenService::new(&config.auth);
        let settings = DbSettings::new(pool.clone(), cipher);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                settings,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Database-backed settings with decryption.
    #[must_use]
    pub fn settings(&self) -> &DbSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Mailer resolving SMTP settings from the database, then env.
    #[must_use]
    pub fn mailer(&self) -> Mailer<DbSettings> {
        Mailer::new(self.inner.settings.clone())
    }

    /// `OpenAI` content helpers keyed from the database, then env.
    #[must_use]
    pub fn ai(&self) -> AiService<DbSettings> {
        AiService::new(self.inner.settings.clone())
    }

    #[must_use]
    pub fn templates(&self) -> EmailTemplates {
        EmailTemplates::new(
            self.inner.config.site_name.clone(),
            self.inner.config.store_base_url.clone(),
        )
    }

    #[must_use]
    pub fn branding(&self) -> EmailBranding {
        EmailBranding {
            site_name: self.inner.config.site_name.clone(),
            store_url: self.inner.config.store_base_url.clone(),
        }
    }
}
