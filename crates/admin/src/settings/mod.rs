//! Settings lookup abstractions.
//!
//! Mail and AI helpers never talk to a concrete store. They resolve each
//! value through a [`SettingsSource`] first and an [`EnvSource`] second, so
//! the same code runs against the remote settings API (CLI), the database
//! (server) or an in-memory map (tests).

mod integrations;
mod store;

use std::collections::HashMap;
use std::future::Future;

pub use integrations::{EmailSettings, FacebookConfig, OpenAiSettings, StripeConfig};
pub use store::DbSettings;

/// Anything that can answer "what is the value of setting `key`?".
///
/// Implementations swallow their own failures: an unreachable store and
/// a missing key both yield `None`.
pub trait SettingsSource: Send + Sync {
    /// Look up a single setting, already decrypted.
    fn get(&self, key: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Anything that can answer "what is environment variable `name`?".
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of key/value pairs.
///
/// Serves as both a settings source and an environment source, which keeps
/// precedence tests free of global state.
#[derive(Debug, Clone, Default)]
pub struct StaticValues(HashMap<String, String>);

impl StaticValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }

    /// Add or replace a value.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl SettingsSource for StaticValues {
    async fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl EnvSource for StaticValues {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Treat empty strings as unset, the way a blank form field should be.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve a value from the settings store, then the environment.
pub async fn setting_or_env<S, E>(settings: &S, env: &E, key: &str, env_var: &str) -> Option<String>
where
    S: SettingsSource,
    E: EnvSource,
{
    match non_empty(settings.get(key).await) {
        Some(value) => Some(value),
        None => non_empty(env.var(env_var)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setting_overrides_env() {
        let settings = StaticValues::from_pairs([("smtp_host", "smtp.db.example")]);
        let env = StaticValues::from_pairs([("SMTP_HOST", "smtp.env.example")]);

        let host = setting_or_env(&settings, &env, "smtp_host", "SMTP_HOST").await;
        assert_eq!(host.as_deref(), Some("smtp.db.example"));
    }

    #[tokio::test]
    async fn test_env_used_when_setting_missing_or_blank() {
        let env = StaticValues::from_pairs([("SMTP_HOST", "smtp.env.example")]);

        let host = setting_or_env(&StaticValues::new(), &env, "smtp_host", "SMTP_HOST").await;
        assert_eq!(host.as_deref(), Some("smtp.env.example"));

        let blank = StaticValues::from_pairs([("smtp_host", "  ")]);
        let host = setting_or_env(&blank, &env, "smtp_host", "SMTP_HOST").await;
        assert_eq!(host.as_deref(), Some("smtp.env.example"));
    }

    #[tokio::test]
    async fn test_neither_source() {
        let host =
            setting_or_env(&StaticValues::new(), &StaticValues::new(), "smtp_host", "SMTP_HOST")
                .await;
        assert!(host.is_none());
    }
}
