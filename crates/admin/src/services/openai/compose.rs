//! AI-assisted marketing emails: product offers and newsletters.
//!
//! The AI copy is decoration. When the model is unavailable the email is
//! still composed from the request data alone.

use askama::Template;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::{EnvSource, SettingsSource};

use super::content::AiService;

const NEWSLETTER_CARD_LIMIT: usize = 6;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Missing type")]
    MissingType,

    #[error("Missing product data")]
    MissingProduct,

    #[error("Unsupported type")]
    Unsupported(String),

    #[error("Invalid offer: price and discount are out of range")]
    InvalidOffer,

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Body of an email composition request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: ComposeData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeData {
    #[serde(default)]
    pub product_data: Option<ProductData>,
    #[serde(default)]
    pub offer_details: OfferDetails,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetails {
    /// Percent off; zero means no discount.
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub expiry: Option<String>,
    /// Hours the offer is valid.
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Subject and HTML body, ready for [`crate::services::email::EmailOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedEmail {
    pub subject: String,
    pub content: String,
}

/// Shop name for the footer and the link target for call-to-action buttons.
#[derive(Debug, Clone)]
pub struct EmailBranding {
    pub site_name: String,
    pub store_url: String,
}

/// A validated request.
#[derive(Debug, Clone)]
pub enum EmailDraft {
    ProductOffer {
        product: ProductData,
        name: String,
        offer: OfferDetails,
    },
    Newsletter {
        theme: Option<String>,
        products: Vec<ProductData>,
    },
}

impl TryFrom<ComposeRequest> for EmailDraft {
    type Error = ComposeError;

    fn try_from(request: ComposeRequest) -> Result<Self, Self::Error> {
        let kind = request
            .kind
            .filter(|k| !k.is_empty())
            .ok_or(ComposeError::MissingType)?;

        match kind.as_str() {
            "product_offer" => {
                let product = request
                    .data
                    .product_data
                    .ok_or(ComposeError::MissingProduct)?;
                let name = product
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or(ComposeError::MissingProduct)?;
                Ok(Self::ProductOffer {
                    product,
                    name,
                    offer: request.data.offer_details,
                })
            }
            "newsletter" => Ok(Self::Newsletter {
                theme: request.data.theme,
                products: request.data.products,
            }),
            other => Err(ComposeError::Unsupported(other.to_string())),
        }
    }
}

struct PriceLine {
    current: String,
    original: Option<String>,
}

#[derive(Template)]
#[template(path = "email/ai_product_offer.html")]
struct ProductOfferHtml<'a> {
    site_name: &'a str,
    store_url: &'a str,
    subject: &'a str,
    description: Option<&'a str>,
    price: Option<PriceLine>,
    paragraphs: Vec<Vec<String>>,
    quantity: Option<u32>,
    expiry: Option<&'a str>,
}

struct ProductCard {
    name: String,
    price: Option<String>,
}

#[derive(Template)]
#[template(path = "email/ai_newsletter.html")]
struct NewsletterHtml<'a> {
    site_name: &'a str,
    store_url: &'a str,
    theme_label: &'a str,
    paragraphs: Vec<Vec<String>>,
    cards: Vec<ProductCard>,
}

/// Split model output into paragraphs of lines. Blank-line runs separate
/// paragraphs; single newlines become line breaks.
fn paragraphs(text: &str) -> Vec<Vec<String>> {
    text.split("\n\n")
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.is_empty())
        .map(|p| p.split('\n').map(str::to_string).collect())
        .collect()
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// `price * (100 - discount) / 100`, or `None` on overflow.
fn discounted(price: Decimal, discount: Decimal) -> Option<Decimal> {
    Decimal::ONE_HUNDRED
        .checked_sub(discount)
        .and_then(|rest| price.checked_mul(rest))
        .and_then(|total| total.checked_div(Decimal::ONE_HUNDRED))
}

fn non_zero(discount: Option<Decimal>) -> Option<Decimal> {
    discount.filter(|d| !d.is_zero())
}

fn offer_subject(name: &str, offer: &OfferDetails) -> String {
    let head = non_zero(offer.discount)
        .map_or_else(|| "Ofertë speciale".to_string(), |d| format!("Zbritje {}%", d.normalize()));
    let mut subject = format!("{head} për {name}");
    if let Some(hours) = offer.time_limit.filter(|h| *h > 0) {
        subject.push_str(&format!(" – Vetëm për {hours} orë!"));
    }
    subject
}

fn theme_label(theme: Option<&str>) -> &'static str {
    match theme {
        Some(t) if t.eq_ignore_ascii_case("seasonal") => "Koleksioni i Ri",
        Some(t) if t.eq_ignore_ascii_case("trending") => "Produktet Trending",
        _ => "Newsletter Javor",
    }
}

impl EmailDraft {
    /// Render with optional AI copy.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidOffer` if the discounted price
    /// overflows, or `ComposeError::Template` if rendering fails.
    pub fn render(
        &self,
        branding: &EmailBranding,
        ai_copy: Option<&str>,
        today: NaiveDate,
    ) -> Result<ComposedEmail, ComposeError> {
        let paragraphs = ai_copy.map(paragraphs).unwrap_or_default();

        match self {
            Self::ProductOffer {
                product,
                name,
                offer,
            } => {
                let subject = offer_subject(name, offer);
                let discount = non_zero(offer.discount);
                let price = product
                    .price
                    .map(|price| match discount {
                        Some(d) => discounted(price, d)
                            .map(|current| PriceLine {
                                current: money(current),
                                original: Some(money(price)),
                            })
                            .ok_or(ComposeError::InvalidOffer),
                        None => Ok(PriceLine {
                            current: money(price),
                            original: None,
                        }),
                    })
                    .transpose()?;

                let content = ProductOfferHtml {
                    site_name: &branding.site_name,
                    store_url: &branding.store_url,
                    subject: &subject,
                    description: product.description.as_deref().filter(|d| !d.is_empty()),
                    price,
                    paragraphs,
                    quantity: offer.quantity.filter(|q| *q > 0),
                    expiry: offer.expiry.as_deref().filter(|e| !e.is_empty()),
                }
                .render()?;

                Ok(ComposedEmail { subject, content })
            }
            Self::Newsletter { theme, products } => {
                let label = theme_label(theme.as_deref());
                let cards = products
                    .iter()
                    .take(NEWSLETTER_CARD_LIMIT)
                    .map(|p| ProductCard {
                        name: p
                            .name
                            .clone()
                            .filter(|n| !n.is_empty())
                            .unwrap_or_else(|| "Produkt".to_string()),
                        price: p.price.map(money),
                    })
                    .collect();

                let content = NewsletterHtml {
                    site_name: &branding.site_name,
                    store_url: &branding.store_url,
                    theme_label: label,
                    paragraphs,
                    cards,
                }
                .render()?;

                Ok(ComposedEmail {
                    subject: format!("{label} – {}", today.format("%-d.%-m.%Y")),
                    content,
                })
            }
        }
    }

    /// Arguments for the marketing prompt that decorates this draft.
    fn marketing_prompt(&self) -> (&str, &'static str, &'static str) {
        match self {
            Self::ProductOffer { name, .. } => (name, "Klientët e dyqanit online", "email_offer"),
            Self::Newsletter { .. } => ("Produkte të përzgjedhura", "Të gjithë abonentët", "newsletter"),
        }
    }
}

impl<S: SettingsSource, E: EnvSource> AiService<S, E> {
    /// Validate `request`, ask the model for copy, and render the email.
    ///
    /// # Errors
    ///
    /// Returns a `ComposeError` for an invalid request or a template
    /// failure. AI failures are not errors.
    pub async fn compose_email(
        &self,
        request: ComposeRequest,
        branding: &EmailBranding,
        today: NaiveDate,
    ) -> Result<ComposedEmail, ComposeError> {
        let draft = EmailDraft::try_from(request)?;

        let (product, audience, campaign) = draft.marketing_prompt();
        let ai_copy = self
            .generate_marketing_content(product, audience, campaign)
            .await
            .ok()
            .map(|c| c.content)
            .filter(|c| !c.trim().is_empty());

        draft.render(branding, ai_copy.as_deref(), today)
    }
}
