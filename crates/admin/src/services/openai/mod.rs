//! `OpenAI` integration for catalog and marketing content.
//!
//! The key is looked up on every call (settings first, then the
//! environment) and a fresh client is built from it. Nothing here retries.

mod client;
mod compose;
mod content;
mod error;
mod types;

pub use client::{CHAT_MODEL, IMAGE_MODEL, OPENAI_API_URL, OpenAiClient, Sampling};
pub use compose::{
    ComposeData, ComposeError, ComposeRequest, ComposedEmail, EmailBranding, EmailDraft,
    OfferDetails, ProductData,
};
pub use content::{
    AiOutcome, AiService, Description, Images, Insights, MarketingContent, ProductSuggestion,
    SalesItem, SuggestRequest,
};
pub use error::{KEY_NOT_CONFIGURED, OpenAiError};
pub use types::{ImageOptions, ImageQuality, ImageSize};
