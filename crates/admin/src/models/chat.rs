//! Live chat domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use proudshop_core::{ChatMessageId, ChatRole, ChatSessionId, Email};

/// A storefront chat conversation.
///
/// `session_id` is the public handle the widget keeps in local storage; the
/// numeric `id` is internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: ChatSessionId,
    /// Public session identifier (UUID string).
    pub session_id: String,
    pub customer_email: Option<Email>,
    pub customer_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every new message; sessions list newest first by this.
    pub last_activity_at: DateTime<Utc>,
}

/// A message in a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub chat_session_id: ChatSessionId,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A session together with its messages in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionWithMessages {
    #[serde(flatten)]
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession {
            id: ChatSessionId::new(1),
            session_id: "7f1c2a4e-0000-4000-8000-000000000001".to_string(),
            customer_email: None,
            customer_name: Some("Arta".to_string()),
            created_at: Utc::now(),
            last_activity_at: Utc::now(),
        }
    }

    #[test]
    fn test_chat_message_serialization() {
        let message = ChatMessage {
            id: ChatMessageId::new(1),
            chat_session_id: ChatSessionId::new(1),
            role: ChatRole::Admin,
            content: "Përshëndetje!".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["content"], "Përshëndetje!");
    }

    #[test]
    fn test_session_with_messages_is_flat() {
        let full = ChatSessionWithMessages {
            session: session(),
            messages: vec![],
        };

        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["customer_name"], "Arta");
        assert!(json["messages"].as_array().unwrap().is_empty());
        assert!(json.get("session").is_none());
    }
}
