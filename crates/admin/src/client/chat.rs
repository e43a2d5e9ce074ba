//! Live-chat client and fixed-interval poller.
//!
//! The poller asks for the whole session every [`POLL_INTERVAL`] and
//! reports messages it has not seen yet. There is no backoff and no
//! ordering guarantee across polls beyond "the latest snapshot wins".

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use proudshop_core::{ChatMessageId, ChatRole, Email};

use super::{ApiClient, ClientError};
use crate::models::{ChatMessage, ChatSession, ChatSessionWithMessages};

/// How often the widget checks for new messages.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct NewSession<'a> {
    customer_name: Option<&'a str>,
    customer_email: Option<&'a Email>,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    content: &'a str,
    role: ChatRole,
}

/// Client for `/chat/sessions`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    api: ApiClient,
}

impl ChatClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Open a new session.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    #[instrument(skip(self, customer_email))]
    pub async fn create_session(
        &self,
        customer_name: Option<&str>,
        customer_email: Option<&Email>,
    ) -> Result<ChatSession, ClientError> {
        self.api
            .post_json(
                &["chat", "sessions"],
                &NewSession {
                    customer_name,
                    customer_email,
                },
            )
            .await
    }

    /// A session with all of its messages.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for an unknown session, or another
    /// `ClientError` if the request fails.
    pub async fn get_session(&self, session_id: &str) -> Result<ChatSessionWithMessages, ClientError> {
        self.api.get_json(&["chat", "sessions", session_id]).await
    }

    /// Post a message to a session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for an unknown session,
    /// `ClientError::Unauthorized` when posting as a non-customer without a
    /// token, or another `ClientError` if the request fails.
    #[instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        role: ChatRole,
    ) -> Result<ChatMessage, ClientError> {
        self.api
            .post_json(
                &["chat", "sessions", session_id, "messages"],
                &NewMessage { content, role },
            )
            .await
    }

    /// Recent sessions (admin only).
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSessionWithMessages>, ClientError> {
        self.api.get_json(&["chat", "sessions"]).await
    }

    /// Delete a session (admin only).
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.api.delete(&["chat", "sessions", session_id]).await
    }
}

/// Polls one session and yields only messages it has not reported before.
#[derive(Debug)]
pub struct ChatPoller {
    client: ChatClient,
    session_id: String,
    interval: Duration,
    seen: HashSet<ChatMessageId>,
}

impl ChatPoller {
    #[must_use]
    pub fn new(client: ChatClient, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            interval: POLL_INTERVAL,
            seen: HashSet::new(),
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Mark messages as already shown, e.g. ones printed before polling.
    pub fn mark_seen<'a>(&mut self, messages: impl IntoIterator<Item = &'a ChatMessage>) {
        self.seen.extend(messages.into_iter().map(|m| m.id));
    }

    /// Fetch the session once and return messages not reported before, in
    /// chronological order.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the request fails; the seen set is left
    /// unchanged.
    pub async fn poll_once(&mut self) -> Result<Vec<ChatMessage>, ClientError> {
        let snapshot = self.client.get_session(&self.session_id).await?;
        Ok(self.take_unseen(snapshot.messages))
    }

    fn take_unseen(&mut self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        messages
            .into_iter()
            .filter(|m| self.seen.insert(m.id))
            .collect()
    }

    /// Poll until `shutdown` resolves, calling `on_message` for each new
    /// message.
    ///
    /// The first poll happens immediately. Failed polls are logged and
    /// skipped; the next one runs on schedule.
    pub async fn run<F>(mut self, shutdown: impl Future<Output = ()>, mut on_message: F)
    where
        F: FnMut(&ChatMessage),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::debug!(session_id = %self.session_id, "Chat polling stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(messages) => messages.iter().for_each(&mut on_message),
                        Err(e) => {
                            tracing::warn!(session_id = %self.session_id, error = %e, "Chat poll failed");
                        }
                    }
                }
            }
        }
    }
}

/// What the widget remembers between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

/// A small JSON file holding the current chat session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session, or `None` if the file is missing or unreadable.
    pub async fn load(&self) -> Option<StoredSession> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt chat state file");
                None
            }
        }
    }

    /// Persist the session.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub async fn save(&self, session: &StoredSession) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(session).map_err(std::io::Error::other)?;
        tokio::fs::write(&self.path, json).await
    }

    /// Forget the session. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be removed.
    pub async fn clear(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    const SESSION: &str = "0b0f5c57-5d1a-4c1e-9b8e-3f5a1c2d3e4f";

    fn session_body(message_ids: &[i32]) -> String {
        let messages: Vec<serde_json::Value> = message_ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id, "chat_session_id": 1, "role": "admin",
                    "content": format!("message {id}"),
                    "created_at": "2026-01-01T00:00:00Z"
                })
            })
            .collect();
        serde_json::json!({
            "id": 1, "session_id": SESSION, "customer_email": null,
            "customer_name": "Arta", "created_at": "2026-01-01T00:00:00Z",
            "last_activity_at": "2026-01-01T00:00:00Z", "messages": messages
        })
        .to_string()
    }

    fn chat_client(server: &mockito::Server) -> ChatClient {
        ChatClient::new(ApiClient::new(&server.url(), None).unwrap())
    }

    #[tokio::test]
    async fn test_poll_once_reports_only_new_messages() {
        let mut server = mockito::Server::new_async().await;
        let path = format!("/chat/sessions/{SESSION}");

        let first = server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(session_body(&[1, 2]))
            .create_async()
            .await;
        let mut poller = ChatPoller::new(chat_client(&server), SESSION);
        let got: Vec<i32> = poller
            .poll_once()
            .await
            .unwrap()
            .iter()
            .map(|m| m.id.as_i32())
            .collect();
        assert_eq!(got, vec![1, 2]);
        first.remove_async().await;

        let _second = server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(session_body(&[1, 2, 3]))
            .create_async()
            .await;
        let got: Vec<i32> = poller
            .poll_once()
            .await
            .unwrap()
            .iter()
            .map(|m| m.id.as_i32())
            .collect();
        assert_eq!(got, vec![3]);

        assert!(poller.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_seen_set() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", format!("/chat/sessions/{SESSION}").as_str())
            .with_status(500)
            .create_async()
            .await;

        let mut poller = ChatPoller::new(chat_client(&server), SESSION);
        assert!(poller.poll_once().await.is_err());
        assert!(poller.seen.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", format!("/chat/sessions/{SESSION}").as_str())
            .with_status(200)
            .with_body(session_body(&[7]))
            .create_async()
            .await;

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let poller = ChatPoller::new(chat_client(&server), SESSION)
            .with_interval(Duration::from_millis(50));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(poller.run(
            async {
                let _ = rx.await;
            },
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        // Same message on every poll, reported once
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_store_roundtrip() {
        let path = std::env::temp_dir().join(format!("proudshop-chat-{}.json", uuid::Uuid::new_v4()));
        let store = SessionStore::new(&path);
        assert!(store.load().await.is_none());

        let stored = StoredSession {
            session_id: SESSION.to_string(),
            customer_name: Some("Arta".to_string()),
            customer_email: None,
        };
        store.save(&stored).await.unwrap();
        assert_eq!(store.load().await, Some(stored));

        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_session_store_ignores_corrupt_file() {
        let path = std::env::temp_dir().join(format!("proudshop-chat-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "{not json").await.unwrap();
        let store = SessionStore::new(&path);
        assert!(store.load().await.is_none());
        store.clear().await.unwrap();
    }
}
