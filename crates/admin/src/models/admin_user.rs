//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use proudshop_core::{AdminUserId, Email};

// Re-export AdminRole from core for convenience
pub use proudshop_core::AdminRole;

/// A back-office operator.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminUserId,
    /// Admin's email address (login name).
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_user_serialization() {
        let admin = AdminUser {
            id: AdminUserId::new(3),
            email: Email::parse("ops@proudshop.al").unwrap(),
            name: "Ops".to_string(),
            role: AdminRole::SuperAdmin,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&admin).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["email"], "ops@proudshop.al");
        assert_eq!(json["role"], "super_admin");
        assert!(json.get("password_hash").is_none());
    }
}
