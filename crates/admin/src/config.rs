//! Admin API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 8000)
//! - `ACCESS_TOKEN_EXPIRE_MINUTES` - Bearer token lifetime (default: 1440)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: `http://localhost:3000`)
//! - `STORE_BASE_URL` - Public storefront URL used in composed emails
//! - `SITE_NAME` - Shop name used in composed emails (default: `ProudShop`)
//! - `ENCRYPTION_KEY` - Passphrase for encrypted settings (falls back to `JWT_SECRET`)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! SMTP and `OpenAI` credentials are not part of this struct: they are
//! resolved per call from the settings table first and the environment
//! second (see [`crate::settings`]).

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_MINUTES: i64 = 60 * 24;
/// One year.
const MAX_TOKEN_MINUTES: i64 = 60 * 24 * 365;
pub const DEFAULT_SITE_NAME: &str = "ProudShop";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "change-me",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "default-key",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin API configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing configuration
    pub auth: AuthConfig,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Public storefront URL, used for links in composed emails
    pub store_base_url: String,
    /// Shop name shown in composed emails
    pub site_name: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Bearer token configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: SecretString,
    /// Token lifetime in minutes
    pub token_minutes: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_minutes", &self.token_minutes)
            .finish()
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;

        let token_minutes = parse_token_minutes(&get_env_or_default(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            &DEFAULT_TOKEN_MINUTES.to_string(),
        ))?;

        Ok(Self {
            jwt_secret,
            token_minutes,
        })
    }
}

fn parse_token_minutes(raw: &str) -> Result<i64, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("ACCESS_TOKEN_EXPIRE_MINUTES".to_string(), reason)
    };
    let minutes = raw.trim().parse::<i64>().map_err(|e| invalid(e.to_string()))?;
    if minutes <= 0 {
        return Err(invalid("must be positive".to_string()));
    }
    if minutes > MAX_TOKEN_MINUTES {
        return Err(invalid(format!("must be at most {MAX_TOKEN_MINUTES}")));
    }
    Ok(minutes)
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let auth = AuthConfig::from_env()?;
        let cors_origins = parse_origins(&get_env_or_default(
            "CORS_ORIGINS",
            "http://localhost:3000",
        ));
        let store_base_url = get_env_or_default("STORE_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        let site_name = get_env_or_default("SITE_NAME", DEFAULT_SITE_NAME);

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            auth,
            cors_origins,
            store_base_url,
            site_name,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("default-key-change-in-production", "JWT_SECRET")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "JWT_SECRET");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("k".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000, https://proudshop.al ,,"),
            vec!["http://localhost:3000", "https://proudshop.al"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_parse_token_minutes() {
        assert_eq!(parse_token_minutes("1440").unwrap(), 1440);
        assert_eq!(parse_token_minutes(" 60 ").unwrap(), 60);
        assert_eq!(parse_token_minutes("525600").unwrap(), MAX_TOKEN_MINUTES);
        assert!(matches!(
            parse_token_minutes("0"),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            parse_token_minutes("525601"),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            parse_token_minutes(&i64::MAX.to_string()),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(parse_token_minutes("forever").is_err());
    }

    #[test]
    fn test_auth_config_debug_redacts() {
        let auth = AuthConfig {
            jwt_secret: SecretString::from("super-sensitive-value"),
            token_minutes: 60,
        };
        let debug = format!("{auth:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-sensitive-value"));
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            auth: AuthConfig {
                jwt_secret: SecretString::from("x".repeat(32)),
                token_minutes: DEFAULT_TOKEN_MINUTES,
            },
            cors_origins: vec![],
            store_base_url: "http://localhost:3000".to_string(),
            site_name: DEFAULT_SITE_NAME.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
    }
}
