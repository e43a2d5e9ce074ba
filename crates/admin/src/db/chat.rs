//! Database operations for live-chat sessions and messages.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use proudshop_core::{ChatMessageId, ChatRole, ChatSessionId, Email};

use super::RepositoryError;
use crate::models::chat::{ChatMessage, ChatSession, ChatSessionWithMessages};

/// Upper bound on sessions returned by [`ChatRepository::list_sessions`].
pub const SESSION_LIST_LIMIT: i64 = 100;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ChatSessionRow {
    id: i32,
    session_id: String,
    customer_email: Option<String>,
    customer_name: Option<String>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl TryFrom<ChatSessionRow> for ChatSession {
    type Error = RepositoryError;

    fn try_from(row: ChatSessionRow) -> Result<Self, Self::Error> {
        let customer_email = row
            .customer_email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid chat email in database: {e}"))
            })?;

        Ok(Self {
            id: ChatSessionId::new(row.id),
            session_id: row.session_id,
            customer_email,
            customer_name: row.customer_name,
            created_at: row.created_at,
            last_activity_at: row.last_activity_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: i32,
    chat_session_id: i32,
    role: ChatRole,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: ChatMessageId::new(row.id),
            chat_session_id: ChatSessionId::new(row.chat_session_id),
            role: row.role,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

const SESSION_COLUMNS: &str =
    "id, session_id, customer_email, customer_name, created_at, last_activity_at";
const MESSAGE_COLUMNS: &str = "id, chat_session_id, role, content, created_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for chat database operations.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a session with a freshly generated public id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_session(
        &self,
        customer_email: Option<&Email>,
        customer_name: Option<&str>,
    ) -> Result<ChatSession, RepositoryError> {
        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            r"
            INSERT INTO chat_sessions (session_id, customer_email, customer_name)
            VALUES ($1, $2, $3)
            RETURNING {SESSION_COLUMNS}
            "
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(customer_email.map(Email::as_str))
        .bind(customer_name)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Get a session by its public id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a session and its messages, oldest message first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_session_with_messages(
        &self,
        session_id: &str,
    ) -> Result<Option<ChatSessionWithMessages>, RepositoryError> {
        let Some(session) = self.get_session(session_id).await? else {
            return Ok(None);
        };
        let messages = self.get_messages(session.id).await?;
        Ok(Some(ChatSessionWithMessages { session, messages }))
    }

    /// The most recently active sessions, each with its messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSessionWithMessages>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatSessionRow>(&format!(
            r"
            SELECT {SESSION_COLUMNS} FROM chat_sessions
            ORDER BY last_activity_at DESC
            LIMIT $1
            "
        ))
        .bind(SESSION_LIST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        let sessions: Vec<ChatSession> = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = sessions.iter().map(|s| s.id.as_i32()).collect();
        let message_rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS} FROM chat_messages
            WHERE chat_session_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_session: HashMap<ChatSessionId, Vec<ChatMessage>> = HashMap::new();
        for row in message_rows {
            let message = ChatMessage::from(row);
            by_session
                .entry(message.chat_session_id)
                .or_default()
                .push(message);
        }

        Ok(sessions
            .into_iter()
            .map(|session| {
                let messages = by_session.remove(&session.id).unwrap_or_default();
                ChatSessionWithMessages { session, messages }
            })
            .collect())
    }

    /// Append a message and bump the session's last activity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let chat_session_id: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE chat_sessions SET last_activity_at = NOW()
            WHERE session_id = $1
            RETURNING id
            ",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(chat_session_id) = chat_session_id else {
            return Err(RepositoryError::NotFound);
        };

        let row = sqlx::query_as::<_, ChatMessageRow>(&format!(
            r"
            INSERT INTO chat_messages (chat_session_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(chat_session_id)
        .bind(role)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// All messages in a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_messages(
        &self,
        chat_session_id: ChatSessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS} FROM chat_messages
            WHERE chat_session_id = $1
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(chat_session_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a session; its messages go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
