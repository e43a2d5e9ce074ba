//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

/// A structurally valid email address.
///
/// Admin logins, chat customers and mail recipients all go through this
/// type. Validation is deliberately shallow (one `@`, non-empty halves,
/// RFC 5321 length); the SMTP server is the final judge.
///
/// ```
/// use proudshop_core::Email;
///
/// assert!(Email::parse("klient@proudshop.al").is_ok());
/// assert!(Email::parse("no-at-symbol").is_err());
/// assert!(Email::parse("@proudshop.al").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first structural problem.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or("", |(local, _)| local)
    }

    /// The part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }

    /// Mask the local part for display in diagnostics: `a***n@example.com`.
    #[must_use]
    pub fn masked(&self) -> String {
        mask_local_part(&self.0)
    }
}

/// Mask everything but the first and last character before the `@`.
///
/// Works on arbitrary strings so unvalidated configuration values can be
/// shown in diagnostics without leaking them.
#[must_use]
pub fn mask_local_part(value: &str) -> String {
    let (local, rest) = match value.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (value, None),
    };

    let chars: Vec<char> = local.chars().collect();
    let masked = match chars.as_slice() {
        [] => String::new(),
        [first] | [first, _] => format!("{first}*"),
        [first, middle @ .., last] => {
            format!("{first}{}{last}", "*".repeat(middle.len()))
        }
    };

    match rest {
        Some(domain) => format!("{masked}@{domain}"),
        None => masked,
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Rows were validated on insert
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("user@example.com").is_ok());
        assert!(Email::parse("user+tag@shop.co.uk").is_ok());
        assert!(Email::parse("a@b.c").is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let email = Email::parse("  admin@proudshop.al \n").unwrap();
        assert_eq!(email.as_str(), "admin@proudshop.al");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("plain"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("@x.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::EmptyDomain));

        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parts() {
        let email = Email::parse("user@example.com").unwrap();
        assert_eq!(email.local_part(), "user");
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_masking() {
        assert_eq!(mask_local_part("shop@example.com"), "s**p@example.com");
        assert_eq!(mask_local_part("ab@example.com"), "a*@example.com");
        assert_eq!(mask_local_part("x@example.com"), "x*@example.com");
        assert_eq!(mask_local_part("username"), "u******e");
        assert_eq!(mask_local_part(""), "");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Email, _> = serde_json::from_str("\"user@example.com\"");
        assert!(ok.is_ok());
        let bad: Result<Email, _> = serde_json::from_str("\"not-an-email\"");
        assert!(bad.is_err());
    }
}
