//! HTTP clients for the back-office API.
//!
//! Used by the CLI and by anything else that reaches the settings store
//! over the network instead of through the database.

pub mod chat;
pub mod settings;

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

pub use chat::{ChatClient, ChatPoller, POLL_INTERVAL, SessionStore, StoredSession};
pub use settings::{SettingWrite, SettingsClient};

/// Default API location for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Errors from the API clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the bearer token or none was sent.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body was not what we expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// The configured base URL cannot carry path segments.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(alias = "detail", alias = "message")]
    error: String,
}

/// Shared HTTP plumbing: base URL, optional bearer token, JSON in and out.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field(
                "token",
                &if self.inner.token.is_some() {
                    "[SET]"
                } else {
                    "[NOT SET]"
                },
            )
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if `base_url` does not parse or
    /// cannot have a path, and `ClientError::Http` if the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, token: Option<SecretString>) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("proudshop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                token,
            }),
        })
    }

    /// Build a client from `PROUDSHOP_API_URL` and `PROUDSHOP_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            std::env::var("PROUDSHOP_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let token = std::env::var("PROUDSHOP_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::from);
        Self::new(&base_url, token)
    }

    /// Same base URL and HTTP client, different bearer token.
    #[must_use]
    pub fn with_token(&self, token: SecretString) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: self.inner.client.clone(),
                base_url: self.inner.base_url.clone(),
                token: Some(token),
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Append percent-encoded path segments to the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the base URL cannot have a path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` for transport failures, non-success statuses
    /// and unexpected bodies.
    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        Self::handle_response(response).await
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` for transport failures, non-success statuses
    /// and unexpected bodies.
    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// `DELETE` a resource, ignoring any response body.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` for transport failures and non-success
    /// statuses.
    pub async fn delete(&self, segments: &[&str]) -> Result<(), ClientError> {
        let url = self.endpoint(segments)?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    async fn handle_error_status(status: StatusCode, response: reqwest::Response) -> ClientError {
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body),
            Err(e) => return ClientError::Http(e),
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_and_encodes() {
        let api = ApiClient::new("http://localhost:8000/api/v1/", None).unwrap();
        assert_eq!(
            api.endpoint(&["settings", "smtp host"]).unwrap().as_str(),
            "http://localhost:8000/api/v1/settings/smtp%20host"
        );

        let api = ApiClient::new("http://localhost:8000/api/v1", None).unwrap();
        assert_eq!(
            api.endpoint(&["settings"]).unwrap().as_str(),
            "http://localhost:8000/api/v1/settings"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", None),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:admin@proudshop.al", None),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let api = ApiClient::new(DEFAULT_API_URL, Some(SecretString::from("tok-123"))).unwrap();
        let debug = format!("{api:?}");
        assert!(debug.contains("[SET]"));
        assert!(!debug.contains("tok-123"));
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _m401 = server
            .mock("GET", "/settings")
            .with_status(401)
            .with_body(r#"{"error":"Not authenticated"}"#)
            .create_async()
            .await;
        let _m404 = server
            .mock("DELETE", "/settings/missing")
            .with_status(404)
            .with_body(r#"{"error":"Not found: setting missing"}"#)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url(), None).unwrap();

        let err = api.get_json::<serde_json::Value>(&["settings"]).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "Not authenticated"));

        let err = api.delete(&["settings", "missing"]).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }
}
