//! Live chat from the terminal: the same calls the storefront widget makes.
//!
//! # Usage
//!
//! ```bash
//! ps-cli chat open --name "Arta" --email arta@example.com
//! ps-cli chat send "Përshëndetje, a e keni në stok?"
//! ps-cli chat watch            # polls every 10 seconds, Ctrl+C to stop
//! ps-cli chat close
//! ```
//!
//! The current session id is kept in a small JSON state file
//! (`.proudshop-chat.json` by default).

use std::path::Path;

use thiserror::Error;

use proudshop_admin::client::{ChatClient, ChatPoller, ClientError, SessionStore, StoredSession};
use proudshop_admin::models::ChatMessage;
use proudshop_core::{ChatRole, Email, EmailError as AddressError};

pub const DEFAULT_STATE_FILE: &str = ".proudshop-chat.json";

#[derive(Debug, Error)]
pub enum ChatCommandError {
    #[error("API error: {0}")]
    Api(#[from] ClientError),

    #[error("Invalid email: {0}")]
    Address(#[from] AddressError),

    #[error("Could not write {path}: {source}")]
    State {
        path: String,
        source: std::io::Error,
    },

    #[error("No open chat session. Run `ps-cli chat open` first.")]
    NoSession,
}

fn client() -> Result<ChatClient, ChatCommandError> {
    Ok(ChatClient::new(super::api_client()?))
}

async fn current(store: &SessionStore) -> Result<StoredSession, ChatCommandError> {
    store.load().await.ok_or(ChatCommandError::NoSession)
}

#[allow(clippy::print_stdout)]
fn print_message(message: &ChatMessage) {
    println!(
        "[{}] {}: {}",
        message.created_at.format("%H:%M:%S"),
        message.role,
        message.content
    );
}

/// Open a session and remember it.
pub async fn open(
    state_file: &Path,
    name: Option<String>,
    email: Option<String>,
) -> Result<(), ChatCommandError> {
    let email = email.as_deref().map(Email::parse).transpose()?;
    let session = client()?
        .create_session(name.as_deref(), email.as_ref())
        .await?;

    let store = SessionStore::new(state_file);
    store
        .save(&StoredSession {
            session_id: session.session_id.clone(),
            customer_name: name,
            customer_email: email.map(|e| e.to_string()),
        })
        .await
        .map_err(|source| ChatCommandError::State {
            path: state_file.display().to_string(),
            source,
        })?;

    tracing::info!("Opened chat session {}", session.session_id);
    Ok(())
}

/// Post a message to the current session.
pub async fn send(state_file: &Path, content: &str, role: ChatRole) -> Result<(), ChatCommandError> {
    let session = current(&SessionStore::new(state_file)).await?;
    let message = client()?
        .send_message(&session.session_id, content, role)
        .await?;
    print_message(&message);
    Ok(())
}

/// Print the history, then poll for new messages until Ctrl+C.
pub async fn watch(state_file: &Path) -> Result<(), ChatCommandError> {
    let session = current(&SessionStore::new(state_file)).await?;
    let client = client()?;

    let history = client.get_session(&session.session_id).await?;
    history.messages.iter().for_each(print_message);

    let mut poller = ChatPoller::new(client, &session.session_id);
    poller.mark_seen(&history.messages);

    tracing::info!("Watching session {} (Ctrl+C to stop)", session.session_id);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };
    poller.run(shutdown, print_message).await;
    Ok(())
}

/// Forget the current session; with `delete`, remove it server-side too
/// (needs an admin token).
pub async fn close(state_file: &Path, delete: bool) -> Result<(), ChatCommandError> {
    let store = SessionStore::new(state_file);
    if delete {
        let session = current(&store).await?;
        client()?.delete_session(&session.session_id).await?;
        tracing::info!("Deleted chat session {}", session.session_id);
    }

    store
        .clear()
        .await
        .map_err(|source| ChatCommandError::State {
            path: state_file.display().to_string(),
            source,
        })
}
