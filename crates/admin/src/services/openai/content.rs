//! Content generation for the shop: product images, descriptions,
//! marketing copy and sales insights.
//!
//! Every public function returns an [`AiOutcome`]. Failures of any kind,
//! including a missing key, end up as `{"success": false, "error": ...}`.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};

use crate::settings::{EnvSource, OpenAiSettings, ProcessEnv, SettingsSource, non_empty};

use super::client::{OPENAI_API_URL, OpenAiClient, Sampling};
use super::error::OpenAiError;
use super::types::ImageOptions;

const DESCRIPTION_SYSTEM: &str = "You are a professional e-commerce copywriter specializing in Albanian product descriptions. Write engaging, persuasive product descriptions that highlight benefits and create desire.";
const MARKETING_SYSTEM: &str = "You are a marketing expert creating campaigns for Albanian/Kosovo market. Create compelling, culturally relevant content that drives sales.";
const COPY_SYSTEM: &str = "You are an ecommerce product copy assistant for Albanian (sq) language unless specified. Return concise output.";
const ANALYST_SYSTEM: &str = "You are a business intelligence analyst providing insights for an Albanian e-commerce platform. Provide clear, actionable insights in Albanian.";

const DESCRIPTION_SAMPLING: Sampling = Sampling {
    max_tokens: 300,
    temperature: 0.7,
};
const MARKETING_SAMPLING: Sampling = Sampling {
    max_tokens: 400,
    temperature: 0.8,
};
const SUGGEST_SAMPLING: Sampling = Sampling {
    max_tokens: 600,
    temperature: 0.7,
};
const ANALYSIS_SAMPLING: Sampling = Sampling {
    max_tokens: 500,
    temperature: 0.3,
};

/// Result of an AI call as the admin UI consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutcome<T> {
    Success(T),
    Failure { error: String },
}

impl<T> AiOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, if the call succeeded.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure { .. } => None,
        }
    }
}

impl<T> From<Result<T, OpenAiError>> for AiOutcome<T> {
    fn from(result: Result<T, OpenAiError>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(e) => {
                tracing::error!(error = %e, "OpenAI call failed");
                Self::Failure {
                    error: e.to_string(),
                }
            }
        }
    }
}

impl<T: Serialize> Serialize for AiOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Success<'a, T> {
            success: bool,
            #[serde(flatten)]
            payload: &'a T,
        }

        #[derive(Serialize)]
        struct Failure<'a> {
            success: bool,
            error: &'a str,
        }

        match self {
            Self::Success(payload) => Success {
                success: true,
                payload,
            }
            .serialize(serializer),
            Self::Failure { error } => Failure {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Images {
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketingContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insights {
    pub insights: String,
}

/// One row of sales data handed to the analyst prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub revenue: Decimal,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Input for a product copy suggestion.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestRequest {
    pub title: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tone: Option<String>,
}

fn default_language() -> String {
    "sq".to_string()
}

/// Improved title, description and SEO tags for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductSuggestion {
    pub suggested_title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionReply {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<Tags>,
}

/// Models answer with either a list or one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tags {
    List(Vec<String>),
    Joined(String),
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        let tags: Vec<String> = match self {
            Self::List(tags) => tags,
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        tags.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

impl ProductSuggestion {
    /// Read the model's JSON answer, unwrapping a ```json fence if there
    /// is one. An unreadable answer yields an empty suggestion.
    fn from_reply(reply: &str) -> Self {
        let json = fenced_json(reply).unwrap_or(reply);
        let parsed: SuggestionReply = serde_json::from_str(json.trim()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unparsable product suggestion");
            SuggestionReply::default()
        });
        Self {
            suggested_title: parsed.title,
            description: parsed.description,
            tags: parsed.tags.map(Tags::into_vec).unwrap_or_default(),
        }
    }
}

fn fenced_json(reply: &str) -> Option<&str> {
    let (_, rest) = reply.split_once("```json")?;
    let (body, _) = rest.split_once("```")?;
    Some(body)
}

/// Resolves the key and runs the content prompts.
#[derive(Debug, Clone)]
pub struct AiService<S, E = ProcessEnv> {
    settings: S,
    env: E,
    base_url: String,
}

impl<S: SettingsSource> AiService<S, ProcessEnv> {
    pub fn new(settings: S) -> Self {
        Self::with_env(settings, ProcessEnv)
    }
}

impl<S: SettingsSource, E: EnvSource> AiService<S, E> {
    pub fn with_env(settings: S, env: E) -> Self {
        Self {
            settings,
            env,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Point at another API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Settings (`OPENAI_API_KEY`, then `openai_api_key`), then env
    /// `OPENAI_API_KEY`.
    pub async fn resolve_key(&self) -> Option<SecretString> {
        match OpenAiSettings::load(&self.settings).await.api_key {
            Some(key) => Some(key),
            None => non_empty(self.env.var("OPENAI_API_KEY")).map(SecretString::from),
        }
    }

    async fn client(&self) -> Result<OpenAiClient, OpenAiError> {
        let key = self.resolve_key().await.ok_or(OpenAiError::NotConfigured)?;
        OpenAiClient::new(&key, &self.base_url)
    }

    pub async fn generate_product_image(&self, options: &ImageOptions) -> AiOutcome<Images> {
        let result = async {
            let images = self.client().await?.generate_images(options).await?;
            Ok::<_, OpenAiError>(Images { images })
        };
        result.await.into()
    }

    pub async fn generate_product_description(
        &self,
        product_name: &str,
        features: &[String],
    ) -> AiOutcome<Description> {
        let prompt = description_prompt(product_name, features);
        let result = async {
            let description = self
                .client()
                .await?
                .complete(DESCRIPTION_SYSTEM, &prompt, DESCRIPTION_SAMPLING)
                .await?;
            Ok::<_, OpenAiError>(Description { description })
        };
        result.await.into()
    }

    pub async fn generate_marketing_content(
        &self,
        product_name: &str,
        target_audience: &str,
        campaign_type: &str,
    ) -> AiOutcome<MarketingContent> {
        let prompt = marketing_prompt(product_name, target_audience, campaign_type);
        let result = async {
            let content = self
                .client()
                .await?
                .complete(MARKETING_SYSTEM, &prompt, MARKETING_SAMPLING)
                .await?;
            Ok::<_, OpenAiError>(MarketingContent { content })
        };
        result.await.into()
    }

    /// Suggest a better title, a description and SEO tags.
    pub async fn suggest_product_copy(
        &self,
        request: &SuggestRequest,
    ) -> AiOutcome<ProductSuggestion> {
        let prompt = suggest_prompt(request);
        let result = async {
            let reply = self
                .client()
                .await?
                .complete(COPY_SYSTEM, &prompt, SUGGEST_SAMPLING)
                .await?;
            Ok::<_, OpenAiError>(ProductSuggestion::from_reply(&reply))
        };
        result.await.into()
    }

    pub async fn analyze_sales_data(&self, items: &[SalesItem]) -> AiOutcome<Insights> {
        let result = async {
            let data = serde_json::to_string(items)
                .map_err(|e| OpenAiError::Parse(format!("Failed to encode sales data: {e}")))?;
            let insights = self
                .client()
                .await?
                .complete(ANALYST_SYSTEM, &analysis_prompt(&data), ANALYSIS_SAMPLING)
                .await?;
            Ok::<_, OpenAiError>(Insights { insights })
        };
        result.await.into()
    }
}

fn description_prompt(product_name: &str, features: &[String]) -> String {
    format!(
        "Write a compelling product description in Albanian language for \"{product_name}\".\n\
         Features: {}.\n\
         Make it engaging, professional, and include benefits.\n\
         Keep it around 150-200 words.",
        features.join(", ")
    )
}

fn marketing_prompt(product_name: &str, target_audience: &str, campaign_type: &str) -> String {
    format!(
        "Create a marketing campaign content in Albanian for \"{product_name}\".\n\
         Target audience: {target_audience}\n\
         Campaign type: {campaign_type}\n\
         Include: catchy headline, compelling copy, and call-to-action.\n\
         Make it persuasive and culturally relevant for Albanian/Kosovo market."
    )
}

fn suggest_prompt(request: &SuggestRequest) -> String {
    let features = if request.features.is_empty() {
        "N/A".to_string()
    } else {
        request.features.join(", ")
    };
    format!(
        "Generate improved product title, 120-160 word engaging description, and 5-10 short comma-separated SEO tags.\n\
         Title: {}\n\
         Features: {features}\n\
         Language: {}\n\
         Tone: {}\n\
         Respond in JSON with keys: title, description, tags (array).",
        request.title,
        request.language,
        request.tone.as_deref().unwrap_or("neutral professional"),
    )
}

fn analysis_prompt(data: &str) -> String {
    format!(
        "Analyze this e-commerce sales data and provide insights:\n\
         {data}\n\n\
         Provide:\n\
         1. Top performing products\n\
         2. Sales trends\n\
         3. Customer behavior insights\n\
         4. Recommendations for improvement\n\n\
         Respond in Albanian language."
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::services::openai::KEY_NOT_CONFIGURED;
    use crate::settings::StaticValues;

    fn service(server: &mockito::Server, key: &str) -> AiService<StaticValues, StaticValues> {
        AiService::with_env(
            StaticValues::from_pairs([("OPENAI_API_KEY", key)]),
            StaticValues::new(),
        )
        .with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_key_precedence() {
        let env = StaticValues::from_pairs([("OPENAI_API_KEY", "sk-env")]);

        let both = StaticValues::from_pairs([("OPENAI_API_KEY", "sk-canonical"), ("openai_api_key", "sk-legacy")]);
        let key = AiService::with_env(both, env.clone()).resolve_key().await.unwrap();
        assert_eq!(key.expose_secret(), "sk-canonical");

        let legacy = StaticValues::from_pairs([("openai_api_key", "sk-legacy")]);
        let key = AiService::with_env(legacy, env.clone()).resolve_key().await.unwrap();
        assert_eq!(key.expose_secret(), "sk-legacy");

        let key = AiService::with_env(StaticValues::new(), env).resolve_key().await.unwrap();
        assert_eq!(key.expose_secret(), "sk-env");
    }

    #[tokio::test]
    async fn test_missing_key_is_failure_outcome() {
        let service = AiService::with_env(StaticValues::new(), StaticValues::new());

        let outcome = service
            .generate_product_description("Çantë", &["lëkurë".to_string()])
            .await;
        assert_eq!(
            outcome,
            AiOutcome::Failure {
                error: KEY_NOT_CONFIGURED.to_string()
            }
        );

        let json = serde_json::to_value(service.analyze_sales_data(&[]).await).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], KEY_NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn test_description_success_shape() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "max_tokens": 300,
                "temperature": 0.7
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Një çantë elegante."}}]}"#)
            .create_async()
            .await;

        let outcome = service(&server, "sk-test")
            .generate_product_description("Çantë", &["lëkurë".to_string(), "e zezë".to_string()])
            .await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "description": "Një çantë elegante."})
        );
    }

    #[tokio::test]
    async fn test_marketing_sampling() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "max_tokens": 400,
                "temperature": 0.8
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Blini tani!"}}]}"#)
            .create_async()
            .await;

        let outcome = service(&server, "sk-test")
            .generate_marketing_content("Atlete", "Të rinjtë", "social")
            .await;
        assert_eq!(outcome.ok().unwrap().content, "Blini tani!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_becomes_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/images/generations")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Your request was rejected","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let outcome = service(&server, "sk-test")
            .generate_product_image(&ImageOptions::new("x"))
            .await;
        match outcome {
            AiOutcome::Failure { error } => assert!(error.contains("Your request was rejected")),
            AiOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_api_is_failure() {
        let service = AiService::with_env(
            StaticValues::from_pairs([("OPENAI_API_KEY", "sk-test")]),
            StaticValues::new(),
        )
        .with_base_url("http://127.0.0.1:9");
        assert!(!service.analyze_sales_data(&[]).await.is_success());
    }

    #[test]
    fn test_prompts() {
        let prompt = description_prompt("Çantë", &["lëkurë".to_string(), "e zezë".to_string()]);
        assert!(prompt.contains("for \"Çantë\""));
        assert!(prompt.contains("Features: lëkurë, e zezë."));

        let prompt = marketing_prompt("Atlete", "Të rinjtë", "email_offer");
        assert!(prompt.contains("Target audience: Të rinjtë"));
        assert!(prompt.contains("Campaign type: email_offer"));
    }

    #[tokio::test]
    async fn test_suggest_reads_fenced_json() {
        let mut server = mockito::Server::new_async().await;
        let reply = "Ja sugjerimi:\n```json\n{\"title\": \"Xhaketë lëkure premium\", \"description\": \"E ngrohtë dhe elegante.\", \"tags\": [\"xhaketë\", \" lëkurë \", \"\"]}\n```";
        let body = serde_json::json!({"choices": [{"message": {"content": reply}}]}).to_string();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "max_tokens": 600,
                "temperature": 0.7
            })))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let request: SuggestRequest =
            serde_json::from_value(serde_json::json!({"title": "Xhaketë"})).unwrap();
        assert_eq!(request.language, "sq");

        let outcome = service(&server, "sk-test").suggest_product_copy(&request).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "suggested_title": "Xhaketë lëkure premium",
                "description": "E ngrohtë dhe elegante.",
                "tags": ["xhaketë", "lëkurë"]
            })
        );
        mock.assert_async().await;
    }

    #[test]
    fn test_suggestion_reply_variants() {
        let joined = ProductSuggestion::from_reply(r#"{"title": "Atlete", "tags": "vrapim, sport ,, verë"}"#);
        assert_eq!(joined.suggested_title.as_deref(), Some("Atlete"));
        assert_eq!(joined.tags, ["vrapim", "sport", "verë"]);
        assert!(joined.description.is_none());

        assert_eq!(ProductSuggestion::from_reply("Nuk mund të ndihmoj."), ProductSuggestion::default());

        let prompt = suggest_prompt(&SuggestRequest {
            title: "Çantë".to_string(),
            features: Vec::new(),
            language: "en".to_string(),
            tone: None,
        });
        assert!(prompt.contains("Features: N/A"));
        assert!(prompt.contains("Language: en"));
        assert!(prompt.contains("Tone: neutral professional"));
    }

    #[test]
    fn test_sales_item_wire_format() {
        let item: SalesItem = serde_json::from_str(
            r#"{"productId":"p1","productName":"Atlete","quantity":3,"revenue":"89.97","date":"2026-10-01"}"#,
        )
        .unwrap();
        assert_eq!(item.revenue, Decimal::new(8997, 2));

        let json = serde_json::to_string(&[item]).unwrap();
        assert!(json.contains("\"productName\":\"Atlete\""));
        assert!(!json.contains("category"));
    }
}
