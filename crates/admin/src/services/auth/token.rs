//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use proudshop_core::AdminUserId;

use super::AdminAuthError;
use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id as a string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies admin bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::minutes(config.token_minutes),
        }
    }

    /// Sign a token for `admin`.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Internal` if signing fails or the expiry
    /// does not fit in a timestamp.
    pub fn issue(&self, admin: AdminUserId) -> Result<String, AdminAuthError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AdminAuthError::Internal("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: admin.as_i32().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AdminAuthError::Internal(e.to_string()))
    }

    /// Check signature and expiry and return the admin id.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidToken` for any token that does not
    /// verify.
    pub fn verify(&self, token: &str) -> Result<AdminUserId, AdminAuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AdminAuthError::InvalidToken
            })?;

        data.claims
            .sub
            .parse::<i32>()
            .map(AdminUserId::new)
            .map_err(|_| AdminAuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(minutes: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: SecretString::from("k8Jq2vXw9ZtR4mNp7LsB3cYh6GdF1aEu"),
            token_minutes: minutes,
        }
    }

    #[test]
    fn test_round_trip() {
        let tokens = TokenService::new(&config(60));
        let token = tokens.issue(AdminUserId::new(42)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), AdminUserId::new(42));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s validation leeway
        let tokens = TokenService::new(&config(-5));
        let token = tokens.issue(AdminUserId::new(1)).unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(AdminAuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = TokenService::new(&config(60))
            .issue(AdminUserId::new(1))
            .unwrap();
        let other = TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from("Zq7Wm2Xp9Lr4Kt6Vn1Bs8Hc3Jd5Fg0Ay"),
            token_minutes: 60,
        });
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_year_long_lifetime_issues() {
        let tokens = TokenService::new(&config(60 * 24 * 365));
        let token = tokens.issue(AdminUserId::new(7)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), AdminUserId::new(7));
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = TokenService::new(&config(60));
        assert!(tokens.verify("not.a.jwt").is_err());
        assert!(tokens.verify("").is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let debug = format!("{:?}", TokenService::new(&config(60)));
        assert!(!debug.contains("k8Jq2v"));
    }
}
