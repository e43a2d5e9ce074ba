//! Role enums shared between the database and the HTTP API.

use serde::{Deserialize, Serialize};

/// Who wrote a live-chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chat_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// The storefront customer.
    #[default]
    User,
    /// A back-office operator answering the customer.
    Admin,
    /// Automated notices (session opened, operator joined, ...).
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            _ => Err(format!("invalid chat role: {s}")),
        }
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access including admin management.
    SuperAdmin,
    /// Full access to store management and settings.
    Admin,
    /// Day-to-day operations (orders, chat).
    Staff,
}

impl AdminRole {
    /// Whether this role may read and write integration settings.
    #[must_use]
    pub const fn can_manage_settings(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Staff => write!(f, "staff"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role_parse_and_display_agree() {
        for role in [AdminRole::SuperAdmin, AdminRole::Admin, AdminRole::Staff] {
            let parsed: AdminRole = role.to_string().parse().expect("parse");
            assert_eq!(parsed, role);
        }
        assert!("viewer".parse::<AdminRole>().is_err());
    }

    #[test]
    fn test_staff_cannot_manage_settings() {
        assert!(AdminRole::SuperAdmin.can_manage_settings());
        assert!(AdminRole::Admin.can_manage_settings());
        assert!(!AdminRole::Staff.can_manage_settings());
    }

    #[test]
    fn test_chat_role_defaults_to_user() {
        assert_eq!(ChatRole::default(), ChatRole::User);
        let role: ChatRole = serde_json::from_str("\"admin\"").expect("deserialize");
        assert_eq!(role, ChatRole::Admin);
    }
}
