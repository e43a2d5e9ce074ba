//! Argon2id password hashing in PHC string format.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::AdminAuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns `AdminAuthError::WeakPassword` for passwords shorter than
/// [`MIN_PASSWORD_LEN`], or `AdminAuthError::Internal` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminAuthError::WeakPassword(MIN_PASSWORD_LEN));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AdminAuthError::Internal(e.to_string()))
}

/// Check a password against a stored PHC hash. A malformed hash never
/// verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is not a valid PHC string");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("fjalëkalim-i-gjatë").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("fjalëkalim-i-gjatë", &hash));
        assert!(!verify_password("fjalekalim-i-gjate", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("short"),
            Err(AdminAuthError::WeakPassword(8))
        ));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
