//! Request and response types for the chat completion and image endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, empty when the model returned nothing.
    #[must_use]
    pub fn first_text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

/// Square output sizes accepted for generated images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    Small,
    #[serde(rename = "512x512")]
    Medium,
    #[default]
    #[serde(rename = "1024x1024")]
    Large,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

/// What to draw and how.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageOptions {
    pub prompt: String,
    #[serde(default)]
    pub size: ImageSize,
    #[serde(default)]
    pub quality: ImageQuality,
    #[serde(default = "default_image_count")]
    pub n: u8,
}

const fn default_image_count() -> u8 {
    1
}

impl ImageOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
            quality: ImageQuality::default(),
            n: default_image_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub size: ImageSize,
    pub quality: ImageQuality,
    pub n: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_options_defaults() {
        let options: ImageOptions =
            serde_json::from_str(r#"{"prompt": "Xhaketë lëkure në sfond të bardhë"}"#)
                .expect("deserialize");
        assert_eq!(options.size, ImageSize::Large);
        assert_eq!(options.quality, ImageQuality::Standard);
        assert_eq!(options.n, 1);
    }

    #[test]
    fn test_image_request_wire_format() {
        let request = ImageRequest {
            model: "dall-e-3",
            prompt: "p",
            size: ImageSize::Medium,
            quality: ImageQuality::Hd,
            n: 2,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["size"], "512x512");
        assert_eq!(json["quality"], "hd");
    }

    #[test]
    fn test_first_text_empty_choices() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).expect("deserialize");
        assert_eq!(response.first_text(), "");
    }
}
