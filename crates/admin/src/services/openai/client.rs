//! Thin `OpenAI` REST client.
//!
//! One instance is built per call from the key resolved at that moment, so
//! a key rotated in settings is picked up immediately.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;

use super::error::{ApiErrorResponse, OpenAiError};
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ImageOptions, ImageRequest, ImageResponse,
    PromptMessage,
};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const CHAT_MODEL: &str = "gpt-4";
pub const IMAGE_MODEL: &str = "dall-e-3";

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client for `base_url` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns `OpenAiError::InvalidApiKey` if the key cannot be sent as a
    /// header, or `OpenAiError::Http` if the HTTP client fails to build.
    pub fn new(api_key: &SecretString, base_url: &str) -> Result<Self, OpenAiError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|_| OpenAiError::InvalidApiKey)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(OpenAiClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Run a system + user prompt through the chat model and return the
    /// first choice's text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with an
    /// error status.
    #[instrument(skip(self, system, user), fields(model = CHAT_MODEL, max_tokens = sampling.max_tokens))]
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: Sampling,
    ) -> Result<String, OpenAiError> {
        let request = ChatCompletionRequest {
            model: CHAT_MODEL.to_string(),
            messages: vec![PromptMessage::system(system), PromptMessage::user(user)],
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
        };

        let response: ChatCompletionResponse = self.post("chat/completions", &request).await?;
        Ok(response.first_text())
    }

    /// Generate images and return their URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with an
    /// error status.
    #[instrument(skip(self, options), fields(model = IMAGE_MODEL, n = options.n))]
    pub async fn generate_images(&self, options: &ImageOptions) -> Result<Vec<String>, OpenAiError> {
        let request = ImageRequest {
            model: IMAGE_MODEL,
            prompt: &options.prompt,
            size: options.size,
            quality: options.quality,
            n: options.n,
        };

        let response: ImageResponse = self.post("images/generations", &request).await?;
        Ok(response.data.into_iter().filter_map(|d| d.url).collect())
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OpenAiError> {
        let url = format!("{}/{path}", self.inner.base_url);
        let response = self.inner.client.post(url).json(body).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OpenAiError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| OpenAiError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> OpenAiError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return OpenAiError::RateLimited(retry_after);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return OpenAiError::Http(e),
        };
        let parsed = serde_json::from_str::<ApiErrorResponse>(&body).ok();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return OpenAiError::Unauthorized(
                parsed.map_or_else(|| "Invalid API key".to_string(), |p| p.error.message),
            );
        }

        match parsed {
            Some(api_error) => OpenAiError::Api {
                error_type: api_error
                    .error
                    .error_type
                    .unwrap_or_else(|| status.as_u16().to_string()),
                message: api_error.error.message,
            },
            None => OpenAiError::Api {
                error_type: status.as_u16().to_string(),
                message: body,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(server: &mockito::Server) -> OpenAiClient {
        OpenAiClient::new(&SecretString::from("sk-test"), &server.url()).unwrap()
    }

    const SAMPLING: Sampling = Sampling {
        max_tokens: 300,
        temperature: 0.7,
    };

    #[tokio::test]
    async fn test_complete_sends_prompt_and_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4",
                "max_tokens": 300,
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "hi"}]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Përshëndetje"}}]}"#)
            .create_async()
            .await;

        let text = client(&server).complete("sys", "hi", SAMPLING).await.unwrap();
        assert_eq!(text, "Përshëndetje");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_images_skips_missing_urls() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/images/generations")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "dall-e-3",
                "size": "1024x1024",
                "quality": "standard",
                "n": 1
            })))
            .with_status(200)
            .with_body(r#"{"data":[{"url":"https://img.example/1.png"},{"b64_json":"..."}]}"#)
            .create_async()
            .await;

        let urls = client(&server)
            .generate_images(&ImageOptions::new("produkt"))
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://img.example/1.png".to_string()]);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#)
            .create_async()
            .await;
        let err = client(&server).complete("s", "u", SAMPLING).await.unwrap_err();
        assert!(matches!(err, OpenAiError::Unauthorized(ref m) if m == "Incorrect API key provided"));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("Retry-After", "7")
            .create_async()
            .await;
        let err = client(&server).complete("s", "u", SAMPLING).await.unwrap_err();
        assert!(matches!(err, OpenAiError::RateLimited(7)));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;
        let err = client(&server).complete("s", "u", SAMPLING).await.unwrap_err();
        assert!(matches!(err, OpenAiError::Api { ref message, .. } if message == "upstream exploded"));
    }

    #[test]
    fn test_invalid_key_header() {
        let err = OpenAiClient::new(&SecretString::from("sk\nbad"), OPENAI_API_URL).unwrap_err();
        assert!(matches!(err, OpenAiError::InvalidApiKey));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = OpenAiClient::new(&SecretString::from("sk-secret"), OPENAI_API_URL).unwrap();
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
